//! Position acquisition for the Pinpoint tracker.
//!
//! A [`LocationSource`] produces a single fix on request. The [`Acquirer`]
//! wraps whichever source the config selects, bounds the wait, and maps every
//! outcome into [`AcquisitionError`] so callers only ever see one taxonomy.
//! The built-in sources are IP geolocation through [IpApi](https://ip-api.com/)
//! and a fixed manual position.

use crate::config::{LocationConfig, ProviderKind};
use crate::models::{is_valid_latitude, is_valid_longitude, Position};
use async_trait::async_trait;
use chrono::Utc;
use ipgeolocate::{GeoError, Locator, Service};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("location access was denied")]
    PermissionDenied,
    #[error("location information is unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("no location source is available")]
    Unsupported,
    #[error("location lookup failed: {0}")]
    Unknown(String),
}

impl AcquisitionError {
    /// Banner text shown to the user.
    pub fn user_message(&self) -> String {
        let reason = match self {
            AcquisitionError::PermissionDenied => {
                "Please allow location access by setting `consent = true` in config.toml."
            }
            AcquisitionError::PositionUnavailable => "Location information is unavailable.",
            AcquisitionError::Timeout => "Location request timed out.",
            AcquisitionError::Unsupported => {
                return "Geolocation is not supported by this configuration.".to_string()
            }
            AcquisitionError::Unknown(_) => "Please ensure location services are enabled.",
        };
        format!("Error getting location. {}", reason)
    }
}

/// Anything that can produce a one-shot position fix.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> Result<Position, AcquisitionError>;
}

/// Approximate location from the public IP address.
pub struct IpLocator {
    target: String,
}

impl IpLocator {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl LocationSource for IpLocator {
    async fn current_position(&self) -> Result<Position, AcquisitionError> {
        match Locator::get(&self.target, Service::IpApi).await {
            Ok(loc) => {
                let fix = fix_from_reply(&loc.latitude, &loc.longitude);
                if fix.is_ok() {
                    info!("Geolocation successful near {}", loc.city);
                }
                fix
            }
            Err(e) => Err(lookup_error(e)),
        }
    }
}

/// Turns the coordinate strings of an IpApi reply into a fix.
///
/// IpApi reports no accuracy radius, so the fix carries none.
pub fn fix_from_reply(latitude: &str, longitude: &str) -> Result<Position, AcquisitionError> {
    let lat = latitude.trim().parse::<f64>().ok().filter(|v| is_valid_latitude(*v));
    let lon = longitude.trim().parse::<f64>().ok().filter(|v| is_valid_longitude(*v));
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            info!("Geolocation reported ({}, {})", lat, lon);
            Ok(Position::fix(lat, lon, None, Utc::now()))
        }
        _ => {
            warn!(
                "Geolocation returned unusable coordinates ({:?}, {:?})",
                latitude, longitude
            );
            Err(AcquisitionError::PositionUnavailable)
        }
    }
}

/// Sorts a failed IpApi lookup into the acquisition taxonomy.
pub fn lookup_error(e: GeoError) -> AcquisitionError {
    match e {
        GeoError::HttpError(e) => {
            error!("Error reaching geolocation service: {}", e);
            AcquisitionError::PositionUnavailable
        }
        GeoError::ParseError(e) => {
            error!("Could not understand geolocation response: {}", e);
            AcquisitionError::Unknown(e)
        }
    }
}

/// A manually configured position; fails only if the configured
/// coordinates are out of range.
pub struct FixedLocation {
    latitude: f64,
    longitude: f64,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self) -> Result<Position, AcquisitionError> {
        if !is_valid_latitude(self.latitude) || !is_valid_longitude(self.longitude) {
            return Err(AcquisitionError::PositionUnavailable);
        }
        Ok(Position::fix(self.latitude, self.longitude, None, Utc::now()))
    }
}

/// Bounded, single-shot access to the configured location source.
///
/// Callers are responsible for not overlapping calls; the tracker session
/// enforces that with its `tracking` flag.
pub struct Acquirer {
    source: Option<Box<dyn LocationSource>>,
    consent: bool,
    timeout: Duration,
}

impl Acquirer {
    pub fn new(source: Option<Box<dyn LocationSource>>, consent: bool, timeout: Duration) -> Self {
        Self {
            source,
            consent,
            timeout,
        }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        let source: Option<Box<dyn LocationSource>> = match config.provider {
            ProviderKind::Ip => Some(Box::new(IpLocator::new(config.ip_lookup_target.clone()))),
            ProviderKind::Manual => Some(Box::new(FixedLocation::new(
                config.manual_lat,
                config.manual_lon,
            ))),
            ProviderKind::Disabled => None,
        };
        Self::new(
            source,
            config.consent,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub async fn acquire(&self) -> Result<Position, AcquisitionError> {
        let Some(source) = self.source.as_ref() else {
            warn!("Location requested but no source is configured");
            return Err(AcquisitionError::Unsupported);
        };
        if !self.consent {
            info!("Location lookup skipped, consent not given");
            return Err(AcquisitionError::PermissionDenied);
        }

        match tokio::time::timeout(self.timeout, source.current_position()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("No location fix within {:?}", self.timeout);
                Err(AcquisitionError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl LocationSource for Stalled {
        async fn current_position(&self) -> Result<Position, AcquisitionError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Position::new(0.0, 0.0))
        }
    }

    struct Failing(AcquisitionError);

    #[async_trait]
    impl LocationSource for Failing {
        async fn current_position(&self) -> Result<Position, AcquisitionError> {
            Err(self.0.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let acquirer = Acquirer::new(Some(Box::new(Stalled)), true, Duration::from_secs(15));
        assert_eq!(acquirer.acquire().await, Err(AcquisitionError::Timeout));
    }

    #[tokio::test]
    async fn missing_source_is_unsupported() {
        let acquirer = Acquirer::new(None, true, Duration::from_secs(15));
        assert_eq!(acquirer.acquire().await, Err(AcquisitionError::Unsupported));
    }

    #[tokio::test]
    async fn source_errors_pass_through() {
        let acquirer = Acquirer::new(
            Some(Box::new(Failing(AcquisitionError::PositionUnavailable))),
            true,
            Duration::from_secs(15),
        );
        assert_eq!(
            acquirer.acquire().await,
            Err(AcquisitionError::PositionUnavailable)
        );
    }

    #[tokio::test]
    async fn manual_source_reports_a_fresh_fix() {
        let mut config = crate::config::Config::default().location;
        config.provider = ProviderKind::Manual;

        let position = Acquirer::from_config(&config).acquire().await.unwrap();
        assert_eq!(position.latitude, config.manual_lat);
        assert_eq!(position.longitude, config.manual_lon);
        assert!(position.captured_at.is_some());
    }

    #[tokio::test]
    async fn refused_consent_is_permission_denied() {
        let mut config = crate::config::Config::default().location;
        config.consent = false;
        assert_eq!(
            Acquirer::from_config(&config).acquire().await,
            Err(AcquisitionError::PermissionDenied)
        );

        config.provider = ProviderKind::Manual;
        assert_eq!(
            Acquirer::from_config(&config).acquire().await,
            Err(AcquisitionError::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn disabled_provider_is_unsupported() {
        let mut config = crate::config::Config::default().location;
        config.provider = ProviderKind::Disabled;
        assert_eq!(
            Acquirer::from_config(&config).acquire().await,
            Err(AcquisitionError::Unsupported)
        );
    }

    #[test]
    fn reply_coordinates_are_validated() {
        let position = fix_from_reply("48.8566", " 2.3522").unwrap();
        assert_eq!((position.latitude, position.longitude), (48.8566, 2.3522));
        assert!(position.captured_at.is_some());
        assert_eq!(position.accuracy, None);

        assert_eq!(
            fix_from_reply("", "2.0"),
            Err(AcquisitionError::PositionUnavailable)
        );
        assert_eq!(
            fix_from_reply("north", "2.0"),
            Err(AcquisitionError::PositionUnavailable)
        );
        assert_eq!(
            fix_from_reply("91", "2.0"),
            Err(AcquisitionError::PositionUnavailable)
        );
        assert_eq!(
            fix_from_reply("10", "-181"),
            Err(AcquisitionError::PositionUnavailable)
        );
    }

    #[test]
    fn lookup_failures_are_classified() {
        assert_eq!(
            lookup_error(GeoError::HttpError("connection refused".to_string())),
            AcquisitionError::PositionUnavailable
        );
        assert_eq!(
            lookup_error(GeoError::ParseError("missing field `lat`".to_string())),
            AcquisitionError::Unknown("missing field `lat`".to_string())
        );
    }

    #[tokio::test]
    async fn out_of_range_manual_position_is_unavailable() {
        assert_eq!(
            FixedLocation::new(95.0, 0.0).current_position().await,
            Err(AcquisitionError::PositionUnavailable)
        );
        assert_eq!(
            FixedLocation::new(0.0, 200.0).current_position().await,
            Err(AcquisitionError::PositionUnavailable)
        );
    }

    #[test]
    fn unknown_failure_message() {
        assert_eq!(
            AcquisitionError::Unknown("boom".into()).user_message(),
            "Error getting location. Please ensure location services are enabled."
        );
        assert_eq!(
            AcquisitionError::Timeout.user_message(),
            "Error getting location. Location request timed out."
        );
    }

    #[test]
    fn permission_message_asks_for_access() {
        assert!(AcquisitionError::PermissionDenied
            .user_message()
            .contains("allow location access"));
    }
}

use crate::models::Position;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("geocoding is not available")]
    CapabilityUnavailable,
    #[error("no address found for this position")]
    NoResult,
    #[error("geocoding failed: {0}")]
    ResolutionFailed(String),
}

impl ResolveError {
    /// Placeholder shown in the address field instead of an address.
    pub fn placeholder(&self) -> &'static str {
        match self {
            ResolveError::CapabilityUnavailable => "Address not available",
            ResolveError::NoResult => "Address not found",
            ResolveError::ResolutionFailed(_) => "Unable to retrieve address",
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        ResolveError::ResolutionFailed(e.to_string())
    }
}

/// Maps a position to a human-readable address.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, position: &Position) -> Result<String, ResolveError>;
}

#[derive(Deserialize, Debug)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    pub error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct GeocodeResult {
    pub formatted_address: String,
}

impl GeocodeResponse {
    /// Picks the best address out of a decoded response.
    pub fn into_address(self) -> Result<String, ResolveError> {
        match self.status.as_str() {
            "OK" => self
                .results
                .into_iter()
                .next()
                .map(|r| r.formatted_address)
                .ok_or(ResolveError::NoResult),
            "ZERO_RESULTS" => Err(ResolveError::NoResult),
            other => Err(ResolveError::ResolutionFailed(match self.error_message {
                Some(msg) => format!("{}: {}", other, msg),
                None => other.to_string(),
            })),
        }
    }
}

/// Reverse geocoding through the Google Geocoding API.
///
/// Without a key every lookup fails with
/// [`ResolveError::CapabilityUnavailable`] and no request is made.
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GoogleGeocoder {
    pub fn new(api_key: Option<String>) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            endpoint: GEOCODE_ENDPOINT.to_string(),
            api_key,
        })
    }

    /// Sends lookups to `endpoint` instead of the public Google API.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl AddressResolver for GoogleGeocoder {
    async fn resolve(&self, position: &Position) -> Result<String, ResolveError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ResolveError::CapabilityUnavailable);
        };

        let latlng = format!("{},{}", position.latitude, position.longitude);
        debug!("Resolving address for {}", latlng);

        let res = self
            .client
            .get(self.endpoint.as_str())
            .query(&[("latlng", latlng.as_str()), ("key", key)])
            .send()
            .await?
            .error_for_status()?
            .json::<GeocodeResponse>()
            .await?;

        let address = res.into_address();
        if let Err(ref e) = address {
            warn!("Geocoder failed due to: {}", e);
        }
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> GeocodeResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn first_result_wins() {
        let res = parse(
            r#"{"status":"OK","results":[
                {"formatted_address":"1 Main St, Springfield"},
                {"formatted_address":"Springfield"}]}"#,
        );
        assert_eq!(res.into_address(), Ok("1 Main St, Springfield".to_string()));
    }

    #[test]
    fn empty_results_are_no_result() {
        assert_eq!(
            parse(r#"{"status":"ZERO_RESULTS","results":[]}"#).into_address(),
            Err(ResolveError::NoResult)
        );
        assert_eq!(
            parse(r#"{"status":"OK"}"#).into_address(),
            Err(ResolveError::NoResult)
        );
    }

    #[test]
    fn quota_errors_are_failures() {
        let res = parse(
            r#"{"status":"OVER_QUERY_LIMIT","results":[],"error_message":"You have exceeded your daily request quota"}"#,
        );
        match res.into_address() {
            Err(ResolveError::ResolutionFailed(msg)) => assert!(msg.starts_with("OVER_QUERY_LIMIT")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_a_failure() {
        // Nothing listens on the discard port.
        let geocoder = GoogleGeocoder::new(Some("test-key".to_string()))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/geocode/json");

        let result = geocoder.resolve(&Position::new(51.5, -0.12)).await;
        assert!(
            matches!(result, Err(ResolveError::ResolutionFailed(_))),
            "{:?}",
            result
        );
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let geocoder = GoogleGeocoder::new(None).unwrap();
        assert!(!geocoder.is_available());
        assert_eq!(
            geocoder.resolve(&Position::new(51.5, -0.12)).await,
            Err(ResolveError::CapabilityUnavailable)
        );
    }
}

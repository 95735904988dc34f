use chrono::{DateTime, Utc};

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// A geographic fix in decimal degrees (WGS84).
///
/// Positions are never mutated: a fresh acquisition or a decoded link
/// produces a new value that replaces the old one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the source reports one.
    pub accuracy: Option<f64>,
    /// When the fix was taken. Link-derived positions leave this unset.
    pub captured_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Bare coordinates with no accuracy or capture metadata.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            captured_at: None,
        }
    }

    /// A fix reported by a location source at `captured_at`.
    ///
    /// Negative or non-finite accuracies are dropped to `None`.
    pub fn fix(
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: accuracy.filter(|a| a.is_finite() && *a >= 0.0),
            captured_at: Some(captured_at),
        }
    }

    pub fn has_valid_coordinates(&self) -> bool {
        is_valid_latitude(self.latitude) && is_valid_longitude(self.longitude)
    }

    /// True when both coordinates match, ignoring accuracy and timestamp.
    pub fn same_place(&self, other: &Position) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

pub fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && value >= LATITUDE_RANGE.0 && value <= LATITUDE_RANGE.1
}

pub fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && value >= LONGITUDE_RANGE.0 && value <= LONGITUDE_RANGE.1
}

/// Where the session's current position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    /// The configured default center, shown before anything else is known.
    Fallback,
    /// Decoded from an incoming share link.
    Link,
    /// Reported by the location source.
    Fix,
}

impl PositionSource {
    pub fn label(&self) -> &'static str {
        match self {
            PositionSource::Fallback => "DEFAULT CENTER",
            PositionSource::Link => "SHARED LINK",
            PositionSource::Fix => "LIVE FIX",
        }
    }
}

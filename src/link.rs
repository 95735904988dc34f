//! Share link encoding and decoding.
//!
//! A share link carries a position as plain query parameters:
//! `<origin><path>?lat=<decimal>&lng=<decimal>&t=<millis>`. The `t` stamp
//! only defeats caches and is ignored when decoding. Everything here is pure;
//! the only clock read is in [`encode`].

use crate::models::{is_valid_latitude, is_valid_longitude, Position};
use std::collections::HashMap;
use thiserror::Error;
use url::{form_urlencoded, Url};

pub const LAT_KEY: &str = "lat";
pub const LNG_KEY: &str = "lng";
pub const STAMP_KEY: &str = "t";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("missing `{0}` parameter")]
    MissingField(&'static str),
    #[error("`{field}` is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("`{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Encodes `position` into a share link stamped with the current time.
pub fn encode(position: &Position, origin: &str, path: &str) -> String {
    encode_at(
        position,
        origin,
        path,
        chrono::Utc::now().timestamp_millis(),
    )
}

/// Encodes `position` into a share link with an explicit cache-busting stamp.
///
/// Coordinates use Rust's shortest round-trip formatting, so no precision
/// is lost on the way back through [`decode`].
pub fn encode_at(position: &Position, origin: &str, path: &str, stamp: i64) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(LAT_KEY, &position.latitude.to_string())
        .append_pair(LNG_KEY, &position.longitude.to_string())
        .append_pair(STAMP_KEY, &stamp.to_string())
        .finish();

    let origin = if path.starts_with('/') {
        origin.trim_end_matches('/')
    } else {
        origin
    };
    format!("{}{}?{}", origin, path, query)
}

/// Parses a query string into a key/value map.
///
/// A leading `?` is tolerated. When a key repeats, the first value wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        map.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    map
}

/// Validates the `lat`/`lng` pair of a parsed query into a [`Position`].
///
/// Checks run in order: presence, numeric parse, range. The result has no
/// accuracy or capture time.
pub fn decode(query: &HashMap<String, String>) -> Result<Position, DecodeError> {
    let raw_lat = field(query, LAT_KEY)?;
    let raw_lng = field(query, LNG_KEY)?;

    let latitude = number(LAT_KEY, raw_lat)?;
    let longitude = number(LNG_KEY, raw_lng)?;

    if !is_valid_latitude(latitude) {
        return Err(DecodeError::OutOfRange {
            field: LAT_KEY,
            value: latitude,
        });
    }
    if !is_valid_longitude(longitude) {
        return Err(DecodeError::OutOfRange {
            field: LNG_KEY,
            value: longitude,
        });
    }

    Ok(Position::new(latitude, longitude))
}

/// Decodes either a full share URL or a bare query string.
pub fn decode_link(link: &str) -> Result<Position, DecodeError> {
    let link = link.trim();
    let query = match Url::parse(link) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => match link.split_once('?') {
            Some((_, query)) => query.to_string(),
            None => link.to_string(),
        },
    };
    decode(&parse_query(&query))
}

fn field<'a>(
    query: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, DecodeError> {
    query
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(DecodeError::MissingField(key))
}

fn number(key: &'static str, raw: &str) -> Result<f64, DecodeError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DecodeError::NotANumber {
            field: key,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn encode_keeps_full_precision() {
        let link = encode(
            &Position::new(37.7749, -122.4194),
            "https://x.test",
            "/tracker",
        );
        assert!(link.starts_with("https://x.test/tracker?"));
        assert!(link.contains("lat=37.7749&lng=-122.4194"));

        let params = parse_query(link.split_once('?').unwrap().1);
        let stamp = params.get(STAMP_KEY).expect("stamp present");
        assert!(stamp.parse::<i64>().is_ok());
    }

    #[test]
    fn encode_at_uses_given_stamp() {
        let link = encode_at(&Position::new(1.5, 2.25), "http://h/", "/tracker", 42);
        assert_eq!(link, "http://h/tracker?lat=1.5&lng=2.25&t=42");
    }

    #[test]
    fn coordinates_survive_a_round_trip() {
        let samples = [
            (0.0, 0.0),
            (90.0, 180.0),
            (-90.0, -180.0),
            (51.5, -0.12),
            (-33.868820123456789, 151.209295987654321),
            (0.1 + 0.2, -179.99999999999997),
        ];
        for (lat, lng) in samples {
            let original = Position::new(lat, lng);
            let link = encode(&original, "https://x.test", "/tracker");
            let decoded = decode_link(&link).unwrap();
            assert!(decoded.same_place(&original), "{link}");
            assert_eq!(decoded.accuracy, None);
            assert_eq!(decoded.captured_at, None);
        }
    }

    #[test]
    fn missing_lng_is_reported() {
        assert_eq!(
            decode(&query(&[("lat", "10")])),
            Err(DecodeError::MissingField("lng"))
        );
        assert_eq!(
            decode(&query(&[("lat", ""), ("lng", "10")])),
            Err(DecodeError::MissingField("lat"))
        );
    }

    #[test]
    fn garbage_is_not_a_number() {
        assert!(matches!(
            decode(&query(&[("lat", "abc"), ("lng", "10")])),
            Err(DecodeError::NotANumber { field: "lat", .. })
        ));
        assert!(matches!(
            decode(&query(&[("lat", "10"), ("lng", "inf")])),
            Err(DecodeError::NotANumber { field: "lng", .. })
        ));
        assert!(matches!(
            decode(&query(&[("lat", "NaN"), ("lng", "10")])),
            Err(DecodeError::NotANumber { .. })
        ));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert_eq!(
            decode(&query(&[("lat", "95"), ("lng", "10")])),
            Err(DecodeError::OutOfRange {
                field: "lat",
                value: 95.0
            })
        );
        assert!(matches!(
            decode(&query(&[("lat", "10"), ("lng", "-180.01")])),
            Err(DecodeError::OutOfRange { field: "lng", .. })
        ));
    }

    #[test]
    fn longitude_beyond_ninety_is_valid() {
        let position = decode(&query(&[("lat", "-33.86"), ("lng", "151.2")])).unwrap();
        assert_eq!(position.longitude, 151.2);
    }

    #[test]
    fn decode_link_accepts_bare_queries() {
        let position = decode_link("?lat=51.5&lng=-0.12&t=123").unwrap();
        assert_eq!((position.latitude, position.longitude), (51.5, -0.12));

        let position = decode_link("/tracker?lat=1&lng=2").unwrap();
        assert_eq!((position.latitude, position.longitude), (1.0, 2.0));
    }

    #[test]
    fn first_repeated_key_wins() {
        let params = parse_query("lat=1&lat=2&lng=3");
        assert_eq!(params.get("lat").map(String::as_str), Some("1"));
    }

    #[test]
    fn stamp_is_ignored() {
        let position = decode(&query(&[("lat", "1"), ("lng", "2"), ("t", "nonsense")])).unwrap();
        assert_eq!((position.latitude, position.longitude), (1.0, 2.0));
    }
}

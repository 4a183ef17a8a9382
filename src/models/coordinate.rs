use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::models::error::TrackerError;

/// Decimal places kept in a [`PathKey`]; ~11 cm at the equator.
pub const PATH_KEY_PRECISION: usize = 6;

/// A validated (latitude, longitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = TrackerError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, TrackerError> {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(TrackerError::InvalidCoordinate { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Cache key for the road path from `start` to `end`.
///
/// Both points are rendered at [`PATH_KEY_PRECISION`] decimals so that
/// positions differing only by float noise share an entry. The key is
/// directional: `(A, B)` and `(B, A)` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey(String);

impl PathKey {
    pub fn new(start: Coordinate, end: Coordinate) -> Self {
        Self(format!(
            "{},{}-{},{}",
            fixed(start.latitude),
            fixed(start.longitude),
            fixed(end.latitude),
            fixed(end.longitude)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PathKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn fixed(value: f64) -> String {
    let text = format!("{:.*}", PATH_KEY_PRECISION, value);
    // -0.0000001 rounds to "-0.000000"
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

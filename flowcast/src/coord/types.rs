//! Geographic coordinate and camera region types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Default camera span (degrees) while browsing the map.
pub const DEFAULT_REGION_SPAN_DEG: f64 = 0.05;

/// Camera span (degrees) used while following the user during navigation.
pub const NAVIGATION_REGION_SPAN_DEG: f64 = 0.005;

/// Errors produced while parsing or validating coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid coordinate '{0}': expected LAT,LON")]
    Malformed(String),
}

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate without validation.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting out-of-range values.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        super::haversine_distance(self, other)
    }

    /// Initial bearing towards `other` in degrees (0-360, clockwise from north).
    pub fn bearing_to(&self, other: &Coordinate) -> f64 {
        super::initial_bearing(self, other)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = CoordError;

    /// Parses `"LAT,LON"` (whitespace around either value is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| CoordError::Malformed(s.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| CoordError::Malformed(s.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| CoordError::Malformed(s.to_string()))?;
        Self::try_new(lat, lon)
    }
}

/// The visible map camera: a center and a square span in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center: Coordinate,
    pub span_deg: f64,
}

impl MapRegion {
    pub fn new(center: Coordinate, span_deg: f64) -> Self {
        Self { center, span_deg }
    }

    /// Default browsing region around `center`.
    pub fn around(center: Coordinate) -> Self {
        Self::new(center, DEFAULT_REGION_SPAN_DEG)
    }

    /// Close-up region used while navigating.
    pub fn navigation(center: Coordinate) -> Self {
        Self::new(center, NAVIGATION_REGION_SPAN_DEG)
    }

    /// Whether `coord` falls inside the region.
    pub fn contains(&self, coord: &Coordinate) -> bool {
        let half = self.span_deg / 2.0;
        (coord.latitude - self.center.latitude).abs() <= half
            && (coord.longitude - self.center.longitude).abs() <= half
    }
}

impl Default for MapRegion {
    fn default() -> Self {
        Self::around(Coordinate::default())
    }
}

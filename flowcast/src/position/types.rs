//! Position and heading samples.

use chrono::{DateTime, Utc};

use super::PositionError;
use crate::coord::{mps_to_mph, Coordinate};

/// A single location fix reported by the device sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters. Negative means the fix is invalid.
    pub horizontal_accuracy: f64,
    /// Ground speed in meters per second. Negative means unknown.
    pub speed_mps: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Create a fix stamped with the current time and unknown speed.
    pub fn new(latitude: f64, longitude: f64, horizontal_accuracy: f64) -> Self {
        Self {
            coordinate: Coordinate::new(latitude, longitude),
            horizontal_accuracy,
            speed_mps: -1.0,
            timestamp: Utc::now(),
        }
    }

    /// Create a fix at `coordinate` with a nominal 5 m accuracy.
    pub fn at(coordinate: Coordinate) -> Self {
        Self::new(coordinate.latitude, coordinate.longitude, 5.0)
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = speed_mps;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether the sensor marked this fix as usable.
    pub fn is_valid(&self) -> bool {
        self.horizontal_accuracy >= 0.0
    }

    /// Ground speed in miles per hour, if known.
    pub fn speed_mph(&self) -> Option<f64> {
        mps_to_mph(self.speed_mps)
    }

    /// Meters between this fix and `other`.
    pub fn distance_to(&self, other: &Position) -> f64 {
        self.coordinate.distance_to(&other.coordinate)
    }

    /// Bearing from this fix towards `target`, in degrees.
    pub fn bearing_to(&self, target: &Coordinate) -> f64 {
        self.coordinate.bearing_to(target)
    }
}

/// A compass heading sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    /// Degrees clockwise from true north.
    pub true_heading: f64,
    /// Maximum deviation in degrees. Negative means the heading is invalid.
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl Heading {
    pub fn new(true_heading: f64, accuracy: f64) -> Self {
        Self {
            true_heading,
            accuracy,
            timestamp: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.accuracy >= 0.0
    }
}

/// Location permission state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Granted,
    Denied,
}

impl AuthorizationStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthorizationStatus::Granted)
    }
}

/// Events fanned out to position subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// A position passed the sample filter.
    Position(Position),
    /// A heading passed the sample filter.
    Heading(Heading),
    /// The permission state changed.
    Authorization(AuthorizationStatus),
    /// The user must be asked for permission by the platform adapter.
    PermissionRequested,
    /// The sensor reported a failure.
    Failed(PositionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_validity() {
        assert!(Position::new(1.0, 2.0, 0.0).is_valid());
        assert!(!Position::new(1.0, 2.0, -1.0).is_valid());
    }

    #[test]
    fn test_speed_mph_unknown_when_negative() {
        let p = Position::new(1.0, 2.0, 5.0);
        assert_eq!(p.speed_mph(), None);
        let moving = p.with_speed(20.0);
        assert!((moving.speed_mph().unwrap() - 44.7388).abs() < 1e-6);
    }

    #[test]
    fn test_heading_validity() {
        assert!(Heading::new(90.0, 10.0).is_valid());
        assert!(!Heading::new(90.0, -1.0).is_valid());
    }
}

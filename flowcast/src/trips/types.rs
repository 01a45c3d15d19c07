//! Saved trip records and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::Coordinate;
use crate::routing::Destination;

/// A named endpoint of a saved trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEndpoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TripEndpoint {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A favorite trip belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTrip {
    /// Assigned by the store; empty until saved.
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub source: TripEndpoint,
    pub destination: TripEndpoint,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub frequently_used: bool,
}

impl SavedTrip {
    /// New unsaved trip created now.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        source: TripEndpoint,
        destination: TripEndpoint,
    ) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            name: name.into(),
            source,
            destination,
            created_at: Utc::now(),
            frequently_used: false,
        }
    }

    /// Destination to feed into a route session.
    pub fn to_destination(&self) -> Destination {
        Destination::named(self.destination.name.clone(), self.destination.coordinate())
    }
}

/// Failures from trip storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripStoreError {
    #[error("Failed to fetch saved routes")]
    Fetch,

    #[error("Failed to delete route")]
    Delete,

    #[error("Failed to update route")]
    Update,

    #[error("Failed to save route")]
    Save,

    #[error("Saved route not found: {0}")]
    NotFound(String),

    #[error("No user is signed in")]
    NotSignedIn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_destination_uses_destination_endpoint() {
        let trip = SavedTrip::new(
            "user-1",
            "Commute",
            TripEndpoint::new("Home", Coordinate::new(37.0, -122.0)),
            TripEndpoint::new("Office", Coordinate::new(37.1, -122.1)),
        );
        let dest = trip.to_destination();
        assert_eq!(dest.name.as_deref(), Some("Office"));
        assert_eq!(dest.coordinate, Coordinate::new(37.1, -122.1));
    }

    #[test]
    fn test_json_field_names() {
        let trip = SavedTrip::new(
            "user-1",
            "Commute",
            TripEndpoint::new("Home", Coordinate::new(37.0, -122.0)),
            TripEndpoint::new("Office", Coordinate::new(37.1, -122.1)),
        );
        let json = serde_json::to_value(&trip).unwrap();
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["frequentlyUsed"], false);
        assert!(json.get("createdAt").is_some());
    }
}

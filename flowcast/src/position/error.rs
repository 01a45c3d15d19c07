//! Location error taxonomy.

use thiserror::Error;

/// Failures surfaced by a position source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("Location access was denied. Please enable location services in Settings.")]
    AuthorizationDenied,

    #[error("Unable to determine location. Please try again.")]
    LocationUnavailable,

    #[error("An unknown location error occurred.")]
    Unknown,
}

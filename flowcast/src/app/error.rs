//! Application error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::provider::DirectionsError;
use crate::routing::RouteError;
use crate::trips::TripStoreError;

/// Errors surfaced by [`NavigationApp`](super::NavigationApp).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to create directions provider: {0}")]
    Provider(#[from] DirectionsError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Trips(#[from] TripStoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

//! Route calculation errors.

use thiserror::Error;

use crate::position::PositionError;
use crate::provider::DirectionsError;

/// Generic message shown for any provider failure.
pub const PROVIDER_ERROR_MESSAGE: &str = "Unable to calculate route. Please try again.";

/// Status text shown while a rate-limited request waits to retry.
pub const RETRYING_MESSAGE: &str = "Rate limited. Retrying...";

/// Failures observable on a route session.
///
/// `Display` yields the user-facing message; the detail carried by
/// `Provider` is for logs only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// The provider is throttling. Retryable.
    #[error("Rate limited. Retrying...")]
    RateLimited,

    #[error("No routes found")]
    NoRoutesFound,

    #[error("Unable to get current location")]
    LocationUnavailable,

    #[error("Unable to calculate route. Please try again.")]
    Provider { detail: String },

    #[error("Location access was denied. Please enable location services in Settings.")]
    PermissionDenied,

    #[error("{mode} routes are not supported")]
    UnsupportedMode { mode: String },
}

impl RouteError {
    pub fn provider(detail: impl Into<String>) -> Self {
        RouteError::Provider {
            detail: detail.into(),
        }
    }

    /// Whether the failure may clear up by retrying the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouteError::RateLimited)
    }

    /// Diagnostic detail for logs.
    pub fn detail(&self) -> String {
        match self {
            RouteError::Provider { detail } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<PositionError> for RouteError {
    fn from(error: PositionError) -> Self {
        match error {
            PositionError::AuthorizationDenied => RouteError::PermissionDenied,
            PositionError::LocationUnavailable | PositionError::Unknown => {
                RouteError::LocationUnavailable
            }
        }
    }
}

impl From<DirectionsError> for RouteError {
    fn from(error: DirectionsError) -> Self {
        match error {
            DirectionsError::RateLimited { .. } => RouteError::RateLimited,
            other => RouteError::provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(RouteError::NoRoutesFound.to_string(), "No routes found");
        assert_eq!(
            RouteError::LocationUnavailable.to_string(),
            "Unable to get current location"
        );
        assert_eq!(
            RouteError::provider("HTTP 500").to_string(),
            PROVIDER_ERROR_MESSAGE
        );
        assert_eq!(RouteError::RateLimited.to_string(), RETRYING_MESSAGE);
    }

    #[test]
    fn test_from_directions_error() {
        assert_eq!(
            RouteError::from(DirectionsError::RateLimited { retry_after: None }),
            RouteError::RateLimited
        );
        let err = RouteError::from(DirectionsError::NoResult);
        assert!(matches!(err, RouteError::Provider { .. }));
        assert_eq!(err.detail(), "No route found");
    }

    #[test]
    fn test_from_position_error() {
        assert_eq!(
            RouteError::from(PositionError::AuthorizationDenied),
            RouteError::PermissionDenied
        );
        assert_eq!(
            RouteError::from(PositionError::Unknown),
            RouteError::LocationUnavailable
        );
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(RouteError::RateLimited.is_retryable());
        assert!(!RouteError::NoRoutesFound.is_retryable());
    }
}

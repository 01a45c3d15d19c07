//! Directions provider types and trait.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::coord::Coordinate;

/// A boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Travel mode understood by the directions provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportMode {
    #[default]
    Automobile,
    Transit,
    Walking,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Automobile => write!(f, "automobile"),
            TransportMode::Transit => write!(f, "transit"),
            TransportMode::Walking => write!(f, "walking"),
        }
    }
}

/// A single directions request.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub transport_mode: TransportMode,
    pub alternates_requested: bool,
}

impl RouteRequest {
    /// Automobile request without alternates.
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin,
            destination,
            transport_mode: TransportMode::Automobile,
            alternates_requested: false,
        }
    }

    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = mode;
        self
    }

    pub fn with_alternates(mut self, alternates: bool) -> Self {
        self.alternates_requested = alternates;
        self
    }
}

/// One maneuver of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    /// Human-readable instruction, e.g. "Turn left onto Main St".
    pub instruction: String,
    /// Length of the step in meters.
    pub distance_m: f64,
    /// Polyline of the step. May be empty for zero-length maneuvers.
    pub geometry: Vec<Coordinate>,
}

impl RouteStep {
    pub fn new(instruction: impl Into<String>, distance_m: f64, geometry: Vec<Coordinate>) -> Self {
        Self {
            instruction: instruction.into(),
            distance_m,
            geometry,
        }
    }

    /// The point a traveller must reach for this step to count as reached.
    pub fn anchor(&self) -> Option<Coordinate> {
        self.geometry.first().copied()
    }
}

/// A candidate route returned by the provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub steps: Vec<RouteStep>,
    pub total_duration: Duration,
    pub total_distance_m: f64,
    pub advisory_notices: Vec<String>,
}

impl Route {
    pub fn new(steps: Vec<RouteStep>, total_duration: Duration, total_distance_m: f64) -> Self {
        Self {
            steps,
            total_duration,
            total_distance_m,
            advisory_notices: Vec::new(),
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.advisory_notices.push(notice.into());
        self
    }

    pub fn first_step(&self) -> Option<&RouteStep> {
        self.steps.first()
    }

    pub fn last_step_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    /// All step geometry concatenated into one polyline.
    pub fn polyline(&self) -> Vec<Coordinate> {
        self.steps
            .iter()
            .flat_map(|s| s.geometry.iter().copied())
            .collect()
    }
}

/// Errors a directions provider can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectionsError {
    /// The provider throttled us. `retry_after` is its hint, if any.
    #[error("Rate limited by directions provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The provider found no route between the points.
    #[error("No route found")]
    NoResult,

    /// Network, HTTP or decoding failure.
    #[error("Directions transport error: {0}")]
    Transport(String),
}

impl DirectionsError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DirectionsError::RateLimited { .. })
    }
}

/// External directions service.
///
/// Implementations must be cancel-safe: dropping the returned future abandons
/// the request.
pub trait DirectionsProvider: Send + Sync {
    /// Calculate candidate routes for `request`.
    ///
    /// Success may carry zero routes.
    fn calculate_routes<'a>(
        &'a self,
        request: &'a RouteRequest,
    ) -> BoxFuture<'a, Result<Vec<Route>, DirectionsError>>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(lat: f64) -> RouteStep {
        RouteStep::new(
            "Go",
            100.0,
            vec![Coordinate::new(lat, 0.0), Coordinate::new(lat + 0.001, 0.0)],
        )
    }

    #[test]
    fn test_anchor_is_first_geometry_point() {
        assert_eq!(step(1.0).anchor(), Some(Coordinate::new(1.0, 0.0)));
        assert_eq!(RouteStep::new("Arrive", 0.0, vec![]).anchor(), None);
    }

    #[test]
    fn test_route_helpers() {
        let route = Route::new(vec![step(1.0), step(2.0)], Duration::from_secs(60), 200.0);
        assert_eq!(route.last_step_index(), Some(1));
        assert_eq!(route.polyline().len(), 4);
        assert_eq!(Route::default().last_step_index(), None);
    }

    #[test]
    fn test_request_builder() {
        let req = RouteRequest::new(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0))
            .with_mode(TransportMode::Walking)
            .with_alternates(true);
        assert_eq!(req.transport_mode, TransportMode::Walking);
        assert!(req.alternates_requested);
    }
}

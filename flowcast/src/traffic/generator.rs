//! Synthetic traffic segment generation.
//!
//! One generation cycle places destinations on a ring around the focal point,
//! asks the provider for a single route to each, and turns every step of the
//! returned routes into a [`TrafficSegment`] with a random congestion level.
//!
//! ```text
//!              0°
//!         300°  ·  60°
//!             \ | /
//!              [F]          F = focal point, ring radius 0.01°
//!             / | \
//!         240°  ·  120°
//!             180°
//! ```
//!
//! Provider calls run through a bounded sliding window. A rate-limit answer
//! abandons the rest of the cycle.

use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CongestionSampler, TrafficSegment};
use crate::coord::{planar_offset, ring_bearings, Coordinate};
use crate::provider::{DirectionsError, DirectionsProvider, Route, RouteRequest};

/// Default number of ring destinations per cycle.
pub const DEFAULT_BEARING_COUNT: usize = 6;

/// Default ring radius in degrees (~1 km).
pub const DEFAULT_RADIUS_DEG: f64 = 0.01;

/// Default cap on concurrent provider calls within a cycle.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

/// Ring geometry and concurrency for a generation cycle.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub bearing_count: usize,
    pub radius_deg: f64,
    pub max_concurrent_requests: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            bearing_count: DEFAULT_BEARING_COUNT,
            radius_deg: DEFAULT_RADIUS_DEG,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

/// Routes gathered by one cycle, plus how the cycle ended.
#[derive(Debug, Default)]
pub struct CycleRoutes {
    pub routes: Vec<Route>,
    pub requests_sent: usize,
    pub failed_requests: usize,
    /// The provider rate-limited us; remaining calls were abandoned.
    pub rate_limited: bool,
    /// The cycle was cancelled before finishing.
    pub cancelled: bool,
}

/// Produces traffic segments around a focal point.
#[derive(Debug, Clone, Default)]
pub struct SegmentGenerator {
    config: GeneratorConfig,
    sampler: CongestionSampler,
}

impl SegmentGenerator {
    pub fn new(config: GeneratorConfig, sampler: CongestionSampler) -> Self {
        Self { config, sampler }
    }

    pub fn sampler(&self) -> &CongestionSampler {
        &self.sampler
    }

    /// Ring destinations around `focal`.
    pub fn destinations(&self, focal: Coordinate) -> Vec<Coordinate> {
        ring_bearings(self.config.bearing_count)
            .into_iter()
            .map(|bearing| planar_offset(&focal, bearing, self.config.radius_deg))
            .collect()
    }

    /// Request one route per ring destination.
    pub async fn collect_routes(
        &self,
        provider: &dyn DirectionsProvider,
        focal: Coordinate,
        cancel: &CancellationToken,
    ) -> CycleRoutes {
        let requests: Vec<RouteRequest> = self
            .destinations(focal)
            .into_iter()
            .map(|dest| RouteRequest::new(focal, dest).with_alternates(false))
            .collect();

        let window = self.config.max_concurrent_requests.max(1);
        let mut outcome = CycleRoutes::default();
        let mut queued = 0;
        let mut in_flight = FuturesUnordered::new();
        while queued < requests.len() && in_flight.len() < window {
            in_flight.push(provider.calculate_routes(&requests[queued]));
            queued += 1;
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.cancelled = true;
                    break;
                }
                next = in_flight.next() => next,
            };

            let Some(result) = next else { break };
            outcome.requests_sent += 1;

            match result {
                Ok(routes) => outcome.routes.extend(routes.into_iter().take(1)),
                Err(DirectionsError::RateLimited { retry_after }) => {
                    warn!(retry_after = ?retry_after, "Rate limited during traffic generation, abandoning cycle");
                    outcome.rate_limited = true;
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "Traffic route request failed");
                    outcome.failed_requests += 1;
                }
            }

            // Refill only after an answer so a rate limit stops further calls.
            if queued < requests.len() {
                in_flight.push(provider.calculate_routes(&requests[queued]));
                queued += 1;
            }
        }

        outcome
    }

    /// Turn every step with at least two points into a segment.
    pub fn build_segments<R: Rng>(&self, routes: &[Route], rng: &mut R) -> Vec<TrafficSegment> {
        routes
            .iter()
            .flat_map(|route| route.steps.iter())
            .filter(|step| step.geometry.len() >= 2)
            .map(|step| TrafficSegment {
                coordinates: step.geometry.clone(),
                congestion_level: self.sampler.sample_level(rng),
                vehicle_count: self.sampler.sample_vehicles(rng),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ScriptedDirectionsProvider;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use std::time::Duration;

    const FOCAL: Coordinate = Coordinate::new(37.7749, -122.4194);

    #[test]
    fn test_six_destinations_on_ring() {
        let generator = SegmentGenerator::default();
        let dests = generator.destinations(FOCAL);
        assert_eq!(dests.len(), 6);
        assert!((dests[0].latitude - (FOCAL.latitude + 0.01)).abs() < 1e-12);
        assert!((dests[3].latitude - (FOCAL.latitude - 0.01)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_collects_one_route_per_destination() {
        let provider = ScriptedDirectionsProvider::straight_lines(2);
        let generator = SegmentGenerator::default();
        let outcome = generator
            .collect_routes(&provider, FOCAL, &CancellationToken::new())
            .await;

        assert_eq!(outcome.routes.len(), 6);
        assert_eq!(outcome.requests_sent, 6);
        assert!(!outcome.rate_limited);
        assert!(provider.calls().iter().all(|c| !c.request.alternates_requested));
    }

    #[tokio::test]
    async fn test_rate_limit_abandons_cycle() {
        let provider = ScriptedDirectionsProvider::straight_lines(2);
        provider.push_routes(vec![]);
        provider.push_error(DirectionsError::RateLimited { retry_after: None });
        let generator = SegmentGenerator::new(
            GeneratorConfig {
                max_concurrent_requests: 1,
                ..Default::default()
            },
            CongestionSampler::default(),
        );

        let outcome = generator
            .collect_routes(&provider, FOCAL, &CancellationToken::new())
            .await;

        assert!(outcome.rate_limited);
        assert_eq!(outcome.requests_sent, 2);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_refills_as_answers_arrive() {
        let provider = ScriptedDirectionsProvider::straight_lines(2).with_latency(Duration::from_secs(1));
        let generator = SegmentGenerator::new(
            GeneratorConfig {
                max_concurrent_requests: 2,
                ..Default::default()
            },
            CongestionSampler::default(),
        );
        let start = tokio::time::Instant::now();

        let outcome = generator
            .collect_routes(&provider, FOCAL, &CancellationToken::new())
            .await;

        assert_eq!(outcome.routes.len(), 6);
        let offsets: Vec<u64> = provider
            .calls()
            .iter()
            .map(|call| (call.at - start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 0, 1, 1, 2, 2]);
    }

    #[tokio::test]
    async fn test_cycle_runs_in_spawned_task() {
        let provider = Arc::new(ScriptedDirectionsProvider::straight_lines(2));
        let generator = SegmentGenerator::default();

        let task_provider = Arc::clone(&provider);
        let outcome = tokio::spawn(async move {
            let cancel = CancellationToken::new();
            generator
                .collect_routes(task_provider.as_ref(), FOCAL, &cancel)
                .await
        })
        .await
        .unwrap();

        assert_eq!(outcome.requests_sent, 6);
        assert_eq!(provider.call_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_cycle() {
        let provider = ScriptedDirectionsProvider::straight_lines(2).with_latency(Duration::from_secs(5));
        let generator = SegmentGenerator::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = generator.collect_routes(&provider, FOCAL, &cancel).await;
        assert!(outcome.cancelled);
        assert!(outcome.routes.is_empty());
    }

    #[test]
    fn test_segments_from_steps() {
        let generator = SegmentGenerator::default();
        let route = crate::provider::straight_line_route(FOCAL, Coordinate::new(37.78, -122.4194), 3);
        let mut rng = StdRng::seed_from_u64(3);
        let segments = generator.build_segments(&[route], &mut rng);

        // The arrival step has a single point and is skipped.
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| (1..=3).contains(&s.vehicle_count)));
    }
}

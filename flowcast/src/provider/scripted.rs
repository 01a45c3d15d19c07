//! Scripted directions provider for tests and offline runs.
//!
//! Responses are served from a FIFO queue; when it is empty the optional
//! responder closure answers instead. Every call is recorded together with
//! the (tokio) instant it was made, so tests can assert on retry spacing.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::types::{
    BoxFuture, DirectionsError, DirectionsProvider, Route, RouteRequest, RouteStep,
};
use crate::coord::Coordinate;

type Responder = dyn Fn(&RouteRequest) -> Result<Vec<Route>, DirectionsError> + Send + Sync;

/// A request observed by [`ScriptedDirectionsProvider`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: RouteRequest,
    pub at: Instant,
}

struct ScriptedResponse {
    result: Result<Vec<Route>, DirectionsError>,
    latency: Duration,
}

/// Provider returning canned responses.
pub struct ScriptedDirectionsProvider {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    responder: Option<Box<Responder>>,
    default_latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedDirectionsProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            responder: None,
            default_latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every unscripted call with `responder`.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&RouteRequest) -> Result<Vec<Route>, DirectionsError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Answer every unscripted call with straight-line routes of `steps` steps.
    pub fn straight_lines(steps: usize) -> Self {
        Self::new().with_responder(move |req| {
            Ok(vec![straight_line_route(req.origin, req.destination, steps)])
        })
    }

    /// Latency applied to responder answers.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    pub fn push(&self, result: Result<Vec<Route>, DirectionsError>) {
        self.push_with_latency(result, Duration::ZERO);
    }

    pub fn push_routes(&self, routes: Vec<Route>) {
        self.push(Ok(routes));
    }

    pub fn push_error(&self, error: DirectionsError) {
        self.push(Err(error));
    }

    pub fn push_with_latency(&self, result: Result<Vec<Route>, DirectionsError>, latency: Duration) {
        self.responses
            .lock()
            .push_back(ScriptedResponse { result, latency });
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }

    fn next_response(&self, request: &RouteRequest) -> ScriptedResponse {
        if let Some(scripted) = self.responses.lock().pop_front() {
            return scripted;
        }
        let result = match &self.responder {
            Some(responder) => responder(request),
            None => Err(DirectionsError::Transport(
                "no scripted response available".to_string(),
            )),
        };
        ScriptedResponse {
            result,
            latency: self.default_latency,
        }
    }
}

impl Default for ScriptedDirectionsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectionsProvider for ScriptedDirectionsProvider {
    fn calculate_routes<'a>(
        &'a self,
        request: &'a RouteRequest,
    ) -> BoxFuture<'a, Result<Vec<Route>, DirectionsError>> {
        self.calls.lock().push(RecordedCall {
            request: request.clone(),
            at: Instant::now(),
        });
        let response = self.next_response(request);

        Box::pin(async move {
            if !response.latency.is_zero() {
                tokio::time::sleep(response.latency).await;
            }
            response.result
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Build a route that walks a straight line from `from` to `to` in `steps`
/// equal steps, finishing with an arrival step at `to`.
pub fn straight_line_route(from: Coordinate, to: Coordinate, steps: usize) -> Route {
    let steps = steps.max(1);
    let point = |i: usize| {
        let t = i as f64 / steps as f64;
        Coordinate::new(
            from.latitude + (to.latitude - from.latitude) * t,
            from.longitude + (to.longitude - from.longitude) * t,
        )
    };

    let mut route_steps: Vec<RouteStep> = (0..steps)
        .map(|i| {
            let start = point(i);
            let end = point(i + 1);
            let instruction = if i == 0 {
                "Depart".to_string()
            } else {
                format!("Continue for segment {}", i + 1)
            };
            RouteStep::new(instruction, start.distance_to(&end), vec![start, end])
        })
        .collect();
    route_steps.push(RouteStep::new("Arrive at destination", 0.0, vec![to]));

    let distance = from.distance_to(&to);
    // 50 km/h
    let duration = Duration::from_secs_f64(distance / 13.9);
    Route::new(route_steps, duration, distance)
}

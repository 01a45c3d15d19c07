//! Route session: candidates, selection and navigation progress.
//!
//! # State Machine
//!
//! ```text
//! Idle --set_destination--> Pending --routes--> RoutesAvailable
//! RoutesAvailable --select_route--> RoutesAvailable
//! RoutesAvailable --start_navigation--> Navigating
//! Navigating --position within 20m of step anchor--> Navigating (step + 1)
//! Navigating --end_navigation--> Idle
//! ```
//!
//! All state lives in a `watch` channel of [`SessionState`] snapshots and is
//! only mutated through the methods below. Resolutions from the request queue
//! carry a ticket; only the most recently issued ticket may change state.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::{RequestListener, RequestQueue, RequestTicket, Resolution};
use super::state::{RequestStatus, SessionState};
use super::{Destination, RouteError};
use crate::coord::MapRegion;
use crate::position::{AuthorizationStatus, Position, PositionEvent, PositionSource};
use crate::provider::Route;

/// Default distance at which a step counts as reached (meters).
pub const DEFAULT_ARRIVAL_RADIUS_M: f64 = 20.0;

/// Configuration for a route session.
#[derive(Debug, Clone)]
pub struct RouteSessionConfig {
    /// A step advances when the user is strictly closer than this to its anchor.
    pub arrival_radius_m: f64,
}

impl Default for RouteSessionConfig {
    fn default() -> Self {
        Self {
            arrival_radius_m: DEFAULT_ARRIVAL_RADIUS_M,
        }
    }
}

#[derive(Default)]
struct RequestBook {
    latest: Option<RequestTicket>,
    pending_destination: Option<Destination>,
}

struct SessionInner {
    config: RouteSessionConfig,
    queue: RequestQueue,
    positions: Arc<dyn PositionSource>,
    state: watch::Sender<SessionState>,
    /// Lock order: `requests` before `state`.
    requests: Mutex<RequestBook>,
}

/// Handle to a route session. Clones share the same session.
#[derive(Clone)]
pub struct RouteSession {
    inner: Arc<SessionInner>,
}

impl RouteSession {
    pub fn new(
        config: RouteSessionConfig,
        queue: RequestQueue,
        positions: Arc<dyn PositionSource>,
    ) -> Self {
        let mut initial = SessionState::default();
        if let Some(position) = positions.latest_position() {
            initial.region = MapRegion::around(position.coordinate);
        }
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(SessionInner {
                config,
                queue,
                positions,
                state,
                requests: Mutex::new(RequestBook::default()),
            }),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Request routes to `destination`.
    ///
    /// Clears any previous error. If a calculation is already pending the new
    /// request is queued behind it and supersedes it. Fails only when the
    /// request queue has stopped; the error is also published on the state.
    pub fn set_destination(&self, destination: Destination) -> Result<RequestTicket, RouteError> {
        let mut book = self.inner.requests.lock();

        if self.inner.state.borrow().is_calculating {
            info!(
                destination = ?destination.name,
                "Route calculation already in progress, queueing new destination"
            );
        }

        let listener: Arc<dyn RequestListener> =
            Arc::new(SessionListener(Arc::downgrade(&self.inner)));
        let ticket = match self.inner.queue.enqueue(destination.clone(), listener) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.inner.state.send_modify(|s| s.route_error = Some(e.clone()));
                return Err(e);
            }
        };
        book.latest = Some(ticket);
        book.pending_destination = Some(destination);

        self.inner.state.send_modify(|s| {
            s.route_error = None;
            s.is_calculating = true;
            s.request_status = RequestStatus::Calculating;
        });

        debug!(ticket = %ticket, "Destination set");
        Ok(ticket)
    }

    /// Select one of the candidate routes.
    ///
    /// Ignored while navigating; end navigation first.
    pub fn select_route(&self, route: Arc<Route>) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.navigation.is_navigating {
                warn!("Ignoring route selection while navigating");
                return false;
            }
            s.current_step = route.first_step().cloned();
            s.selected_route = Some(route);
            s.navigation.current_step_index = 0;
            s.show_route_choices = false;
            true
        })
    }

    /// Start turn-by-turn guidance on the selected route.
    ///
    /// Returns false (and changes nothing) when no route is selected.
    pub fn start_navigation(&self) -> bool {
        let latest = self.inner.positions.latest_position();
        let started = self.inner.state.send_if_modified(|s| {
            let Some(route) = s.selected_route.clone() else {
                warn!("Cannot start navigation without a selected route");
                return false;
            };
            s.navigation.is_navigating = true;
            s.navigation.current_step_index = 0;
            s.current_step = route.first_step().cloned();
            s.show_route_choices = false;
            s.arrived = false;
            if let Some(position) = &latest {
                s.region = MapRegion::navigation(position.coordinate);
            }
            true
        });

        if started {
            info!("Navigation started");
        }
        started
    }

    /// Advance to the next step. Does nothing at the last step.
    pub fn next_step(&self) -> bool {
        self.inner.state.send_if_modified(advance_step)
    }

    /// Feed a position into the session.
    ///
    /// While browsing the camera follows the user. While navigating, a
    /// position closer than the arrival radius to the current step's anchor
    /// advances exactly one step.
    pub fn on_position_update(&self, position: &Position) {
        let radius = self.inner.config.arrival_radius_m;

        self.inner.state.send_if_modified(|s| {
            if !s.navigation.is_navigating {
                s.region = MapRegion::around(position.coordinate);
                return true;
            }

            s.region = MapRegion::navigation(position.coordinate);

            let Some(step) = s.current_step.as_ref() else {
                return true;
            };
            let reached = match step.anchor() {
                Some(anchor) => position.coordinate.distance_to(&anchor) < radius,
                // A step without geometry can't be approached.
                None => true,
            };
            if !reached {
                return true;
            }

            let at_last = s
                .selected_route
                .as_ref()
                .and_then(|r| r.last_step_index())
                .is_some_and(|last| s.navigation.current_step_index >= last);

            if at_last {
                if !s.arrived {
                    s.arrived = true;
                    info!("Reached end of route");
                }
            } else {
                advance_step(s);
            }
            true
        });
    }

    /// Ask the map to recenter on the user.
    pub fn recenter_on_user(&self) {
        self.inner
            .state
            .send_if_modified(|s| !std::mem::replace(&mut s.navigation.should_recenter, true));
    }

    /// Clear the recenter flag. Returns whether it was set.
    pub fn consume_recenter(&self) -> bool {
        let mut was_set = false;
        self.inner.state.send_if_modified(|s| {
            was_set = std::mem::replace(&mut s.navigation.should_recenter, false);
            was_set
        });
        was_set
    }

    /// Clear the error banner.
    pub fn clear_error(&self) {
        self.inner
            .state
            .send_if_modified(|s| s.route_error.take().is_some());
    }

    /// Stop guidance and clear every route-related field.
    pub fn end_navigation(&self) {
        let latest = self.inner.positions.latest_position();
        self.inner.state.send_modify(|s| {
            s.navigation.is_navigating = false;
            s.navigation.current_step_index = 0;
            s.navigation.should_recenter = false;
            s.selected_route = None;
            s.current_step = None;
            s.available_routes.clear();
            s.show_route_choices = false;
            s.destination_name = None;
            s.arrived = false;
            let center = latest
                .as_ref()
                .map(|p| p.coordinate)
                .unwrap_or(s.region.center);
            s.region = MapRegion::around(center);
        });
        info!("Navigation ended");
    }

    /// Spawn a task that forwards position events into the session.
    pub fn spawn_position_listener(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let session = self.clone();
        let mut events = self.inner.positions.subscribe();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => event,
                };

                match event {
                    Ok(PositionEvent::Position(position)) => session.on_position_update(&position),
                    Ok(PositionEvent::Authorization(AuthorizationStatus::Denied)) => {
                        session.inner.state.send_modify(|s| {
                            s.route_error = Some(RouteError::PermissionDenied);
                        });
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Route session lagged behind position updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Route session position listener stopped");
        })
    }
}

/// Move to the next step if there is one.
fn advance_step(s: &mut SessionState) -> bool {
    let Some(route) = s.selected_route.clone() else {
        return false;
    };
    let next = s.navigation.current_step_index + 1;
    match route.steps.get(next) {
        Some(step) => {
            s.navigation.current_step_index = next;
            s.current_step = Some(step.clone());
            info!(step_index = next, instruction = %step.instruction, "Advanced to next step");
            true
        }
        None => {
            debug!("Already at the last step");
            false
        }
    }
}

// =============================================================================
// Queue listener
// =============================================================================

struct SessionListener(Weak<SessionInner>);

impl RequestListener for SessionListener {
    fn on_retrying(&self, ticket: RequestTicket, attempt: u32, delay: Duration) {
        if let Some(inner) = self.0.upgrade() {
            inner.handle_retrying(ticket, attempt, delay);
        }
    }

    fn on_resolved(&self, ticket: RequestTicket, resolution: Resolution) {
        if let Some(inner) = self.0.upgrade() {
            inner.handle_resolved(ticket, resolution);
        }
    }
}

impl SessionInner {
    fn handle_retrying(&self, ticket: RequestTicket, attempt: u32, delay: Duration) {
        let book = self.requests.lock();
        if book.latest != Some(ticket) {
            return;
        }
        self.state.send_modify(|s| {
            s.request_status = RequestStatus::Retrying { attempt, delay };
        });
    }

    fn handle_resolved(&self, ticket: RequestTicket, resolution: Resolution) {
        let mut book = self.requests.lock();
        if book.latest != Some(ticket) {
            debug!(ticket = %ticket, "Discarding stale route resolution");
            return;
        }
        let destination = book.pending_destination.take();

        self.state.send_modify(|s| {
            s.is_calculating = false;
            s.request_status = RequestStatus::Idle;

            match resolution {
                Resolution::Routes(routes) => {
                    if s.navigation.is_navigating {
                        info!(ticket = %ticket, "Ignoring new routes while navigating");
                        return;
                    }
                    s.current_step = routes.first().and_then(|r| r.first_step().cloned());
                    s.selected_route = routes.first().cloned();
                    s.available_routes = routes;
                    s.navigation.current_step_index = 0;
                    s.show_route_choices = true;
                    s.route_error = None;
                    s.destination_name = destination.and_then(|d| d.name);
                }
                Resolution::Failed(error) => {
                    warn!(ticket = %ticket, error = %error.detail(), "Route calculation failed");
                    s.route_error = Some(error);
                }
                Resolution::Superseded => {}
            }
        });
    }
}

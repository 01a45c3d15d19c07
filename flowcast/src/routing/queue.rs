//! Single-flight FIFO of directions requests.
//!
//! The [`RequestQueue`] handle is cheap to clone and only enqueues; all
//! provider traffic happens on one [`RequestWorker`] task so at most one
//! directions call is in flight at a time.
//!
//! # Architecture
//!
//! ```text
//! enqueue(dest) ──► mpsc ──► RequestWorker
//!      │                       │
//!      │ cancels active call   ├─ wait_for_position (20 x 100ms)
//!      ▼                       ├─ provider.calculate_routes ◄──┐
//!  latest ticket               │     RateLimited ──► backoff ──┘ (max 3)
//!                              ├─ listener.on_resolved(ticket, resolution)
//!                              └─ cooldown (500ms) if more work queued
//! ```
//!
//! Every queued request is serviced in order, even when a later one has
//! already been enqueued. Only the call in flight is cancelled by a new
//! enqueue. Each request resolves exactly once, either with routes, a
//! [`RouteError`], or [`Resolution::Superseded`] when its call was cancelled.
//! Listeners compare tickets to drop stale results.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::RateLimitBackoff;
use super::{Destination, RouteError};
use crate::position::{wait_for_position, PositionSource, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::provider::{DirectionsError, DirectionsProvider, Route, RouteRequest, TransportMode};

// =============================================================================
// Configuration
// =============================================================================

/// Default pause between consecutive provider-bound queue items.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);

/// Configuration for the request queue.
#[derive(Debug, Clone)]
pub struct RequestQueueConfig {
    /// Rate-limit retry policy.
    pub backoff: RateLimitBackoff,
    /// Pause after an item that contacted the provider, if more are queued.
    pub cooldown: Duration,
    /// Number of position polls before giving up.
    pub position_poll_attempts: u32,
    /// Interval between position polls.
    pub position_poll_interval: Duration,
    /// Mode used for every queued request.
    pub transport_mode: TransportMode,
    /// Whether alternates are requested.
    pub request_alternates: bool,
}

impl Default for RequestQueueConfig {
    fn default() -> Self {
        Self {
            backoff: RateLimitBackoff::default(),
            cooldown: DEFAULT_COOLDOWN,
            position_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            position_poll_interval: DEFAULT_POLL_INTERVAL,
            transport_mode: TransportMode::Automobile,
            request_alternates: true,
        }
    }
}

// =============================================================================
// Tickets, resolutions and listeners
// =============================================================================

/// Identifies one enqueued request. Tickets increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Final outcome of a queued request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The provider returned at least one route.
    Routes(Vec<Arc<Route>>),
    /// Terminal failure.
    Failed(RouteError),
    /// A later request made this one obsolete. Not an error.
    Superseded,
}

/// Receives progress for a queued request.
///
/// Called from the worker task; implementations must not block.
pub trait RequestListener: Send + Sync {
    /// The request hit a rate limit and will retry after `delay`.
    fn on_retrying(&self, _ticket: RequestTicket, _attempt: u32, _delay: Duration) {}

    /// The request finished. Called exactly once per ticket.
    fn on_resolved(&self, ticket: RequestTicket, resolution: Resolution);
}

// =============================================================================
// Shared bookkeeping
// =============================================================================

#[derive(Default)]
struct QueueShared {
    next_ticket: AtomicU64,
    latest_ticket: AtomicU64,
    /// Queued plus in-flight items.
    pending: AtomicUsize,
    active: Mutex<Option<(RequestTicket, CancellationToken)>>,
}

impl QueueShared {
    fn is_superseded(&self, ticket: RequestTicket) -> bool {
        self.latest_ticket.load(Ordering::SeqCst) > ticket.0
    }

    fn set_active(&self, ticket: RequestTicket, token: CancellationToken) {
        *self.active.lock() = Some((ticket, token));
    }

    fn clear_active(&self, ticket: RequestTicket) {
        let mut active = self.active.lock();
        if matches!(active.as_ref(), Some((t, _)) if *t == ticket) {
            *active = None;
        }
    }
}

struct QueuedRequest {
    ticket: RequestTicket,
    destination: Destination,
    listener: Arc<dyn RequestListener>,
    enqueued_at: Instant,
}

// =============================================================================
// Queue handle
// =============================================================================

/// Handle for enqueueing directions requests.
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<QueuedRequest>,
    shared: Arc<QueueShared>,
}

impl RequestQueue {
    /// Create the queue handle and its worker. Run the worker with
    /// [`RequestWorker::run`].
    pub fn new(
        config: RequestQueueConfig,
        provider: Arc<dyn DirectionsProvider>,
        positions: Arc<dyn PositionSource>,
    ) -> (Self, RequestWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(QueueShared::default());

        let worker = RequestWorker {
            config,
            provider,
            positions,
            shared: Arc::clone(&shared),
            rx,
        };

        (Self { tx, shared }, worker)
    }

    /// Create the queue and spawn its worker on the current runtime.
    pub fn spawn(
        config: RequestQueueConfig,
        provider: Arc<dyn DirectionsProvider>,
        positions: Arc<dyn PositionSource>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (queue, worker) = Self::new(config, provider, positions);
        let handle = tokio::spawn(worker.run(shutdown));
        (queue, handle)
    }

    /// Append a request. Cancels the provider call currently in flight, if any.
    ///
    /// Fails only when the worker has stopped.
    pub fn enqueue(
        &self,
        destination: Destination,
        listener: Arc<dyn RequestListener>,
    ) -> Result<RequestTicket, RouteError> {
        let ticket = RequestTicket(self.shared.next_ticket.fetch_add(1, Ordering::SeqCst) + 1);
        self.shared.latest_ticket.store(ticket.0, Ordering::SeqCst);

        if let Some((active, token)) = self.shared.active.lock().as_ref() {
            debug!(active = %active, ticket = %ticket, "Cancelling in-flight directions call");
            token.cancel();
        }

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        let request = QueuedRequest {
            ticket,
            destination,
            listener,
            enqueued_at: Instant::now(),
        };

        if self.tx.send(request).is_err() {
            warn!(ticket = %ticket, "Request queue is shut down");
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(RouteError::provider("request queue is shut down"));
        }

        debug!(ticket = %ticket, "Directions request enqueued");
        Ok(ticket)
    }

    /// The most recently issued ticket.
    pub fn latest_ticket(&self) -> Option<RequestTicket> {
        match self.shared.latest_ticket.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestTicket(n)),
        }
    }

    /// Number of requests queued or in flight.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.pending() > 0
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Processes queued requests one at a time.
pub struct RequestWorker {
    config: RequestQueueConfig,
    provider: Arc<dyn DirectionsProvider>,
    positions: Arc<dyn PositionSource>,
    shared: Arc<QueueShared>,
    rx: mpsc::UnboundedReceiver<QueuedRequest>,
}

impl RequestWorker {
    /// Runs until shutdown is signalled or every queue handle is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(provider = self.provider.name(), "Request queue starting");

        loop {
            let request = tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                next = self.rx.recv() => match next {
                    Some(request) => request,
                    None => break,
                },
            };

            let ticket = request.ticket;
            let (resolution, contacted_provider) = self.process(&request, &shutdown).await;

            debug!(
                ticket = %ticket,
                queued_ms = request.enqueued_at.elapsed().as_millis() as u64,
                outcome = resolution_label(&resolution),
                "Directions request resolved"
            );

            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            request.listener.on_resolved(ticket, resolution);

            if contacted_provider && self.shared.pending.load(Ordering::SeqCst) > 0 {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.cooldown) => {}
                }
            }
        }

        // Anything still queued resolves so listeners never hang.
        self.rx.close();
        while let Ok(request) = self.rx.try_recv() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            request
                .listener
                .on_resolved(request.ticket, Resolution::Superseded);
        }

        info!("Request queue stopped");
    }

    /// Returns the resolution and whether the provider was contacted.
    async fn process(
        &self,
        request: &QueuedRequest,
        shutdown: &CancellationToken,
    ) -> (Resolution, bool) {
        let ticket = request.ticket;
        let token = shutdown.child_token();
        self.shared.set_active(ticket, token.clone());
        let outcome = self.run_request(request, &token).await;
        self.shared.clear_active(ticket);
        outcome
    }

    async fn run_request(
        &self,
        request: &QueuedRequest,
        token: &CancellationToken,
    ) -> (Resolution, bool) {
        let ticket = request.ticket;

        let origin = tokio::select! {
            biased;
            _ = token.cancelled() => return (Resolution::Superseded, false),
            position = wait_for_position(
                self.positions.as_ref(),
                self.config.position_poll_attempts,
                self.config.position_poll_interval,
            ) => position,
        };

        let origin = match origin {
            Ok(position) => position.coordinate,
            Err(e) => {
                warn!(ticket = %ticket, error = %e, "No position for route origin");
                return (Resolution::Failed(RouteError::from(e)), false);
            }
        };

        let route_request = RouteRequest::new(origin, request.destination.coordinate)
            .with_mode(self.config.transport_mode)
            .with_alternates(self.config.request_alternates);

        let mut retries = 0u32;
        loop {
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return (Resolution::Superseded, true),
                result = self.provider.calculate_routes(&route_request) => result,
            };

            match result {
                Ok(routes) if routes.is_empty() => {
                    info!(ticket = %ticket, "Provider returned no routes");
                    return (Resolution::Failed(RouteError::NoRoutesFound), true);
                }
                Ok(routes) => {
                    info!(
                        ticket = %ticket,
                        routes = routes.len(),
                        retries,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Routes calculated"
                    );
                    return (
                        Resolution::Routes(routes.into_iter().map(Arc::new).collect()),
                        true,
                    );
                }
                Err(DirectionsError::RateLimited { .. }) if self.shared.is_superseded(ticket) => {
                    debug!(ticket = %ticket, "Rate limited after a newer request, not retrying");
                    return (Resolution::Superseded, true);
                }
                Err(DirectionsError::RateLimited { retry_after }) => {
                    let Some(delay) = self.config.backoff.delay_for_retry(retries + 1, retry_after)
                    else {
                        warn!(ticket = %ticket, retries, "Rate limit retries exhausted");
                        return (
                            Resolution::Failed(RouteError::provider("rate limit retries exhausted")),
                            true,
                        );
                    };

                    retries += 1;
                    info!(
                        ticket = %ticket,
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    request.listener.on_retrying(ticket, retries, delay);

                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return (Resolution::Superseded, true),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    warn!(ticket = %ticket, error = %e, "Directions request failed");
                    return (Resolution::Failed(RouteError::provider(e.to_string())), true);
                }
            }
        }
    }
}

fn resolution_label(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::Routes(_) => "routes",
        Resolution::Failed(_) => "failed",
        Resolution::Superseded => "superseded",
    }
}

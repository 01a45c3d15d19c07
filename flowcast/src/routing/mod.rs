//! Route request orchestration
//!
//! - [`RequestQueue`]: single-flight FIFO with rate-limit retry.
//! - [`RouteSession`]: candidates, selection and step-by-step progress.
//! - [`RouteOptions`]: one route per travel mode for comparison.
//!
//! # Example
//!
//! ```ignore
//! let shutdown = CancellationToken::new();
//! let (queue, _worker) = RequestQueue::spawn(RequestQueueConfig::default(), provider, positions.clone(), shutdown.clone());
//! let session = RouteSession::new(RouteSessionConfig::default(), queue, positions);
//! session.set_destination(Destination::named("Ferry Building", coord))?;
//! let mut rx = session.subscribe();
//! rx.wait_for(|s| !s.is_calculating).await?;
//! session.start_navigation();
//! ```

mod backoff;
mod destination;
mod error;
mod options;
mod queue;
mod session;
mod state;

pub use backoff::{
    RateLimitBackoff, DEFAULT_FALLBACK_DELAY, DEFAULT_HINT_PADDING, DEFAULT_MAX_DELAY,
    DEFAULT_MAX_RETRIES,
};
pub use destination::Destination;
pub use error::{RouteError, PROVIDER_ERROR_MESSAGE, RETRYING_MESSAGE};
pub use options::{RouteOption, RouteOptions, TravelMode};
pub use queue::{
    RequestListener, RequestQueue, RequestQueueConfig, RequestTicket, RequestWorker, Resolution,
    DEFAULT_COOLDOWN,
};
pub use session::{RouteSession, RouteSessionConfig, DEFAULT_ARRIVAL_RADIUS_M};
pub use state::{NavigationState, RequestStatus, SessionPhase, SessionState};

//! Directions provider abstraction
//!
//! The [`DirectionsProvider`] trait is the seam to the external routing
//! service. Two implementations ship with the crate:
//!
//! - [`OsrmDirectionsProvider`]: HTTP client for OSRM-compatible servers.
//! - [`ScriptedDirectionsProvider`]: canned responses for tests and offline use.
//!
//! ```ignore
//! use flowcast::provider::{OsrmDirectionsProvider, RouteRequest, DirectionsProvider};
//!
//! let provider = OsrmDirectionsProvider::connect(DEFAULT_OSRM_URL, Duration::from_secs(30))?;
//! let routes = provider.calculate_routes(&RouteRequest::new(origin, dest)).await?;
//! ```

mod http;
mod osrm;
mod scripted;
mod types;

pub use http::{parse_retry_after, HttpClient, HttpResponse, ReqwestClient, DEFAULT_HTTP_TIMEOUT};
pub use osrm::{instruction_text, parse_route_response, OsrmDirectionsProvider, DEFAULT_OSRM_URL};
pub use scripted::{straight_line_route, RecordedCall, ScriptedDirectionsProvider};
pub use types::{
    BoxFuture, DirectionsError, DirectionsProvider, Route, RouteRequest, RouteStep, TransportMode,
};

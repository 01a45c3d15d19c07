//! Device location and heading
//!
//! Filtered position/heading samples, the [`PositionSource`] trait consumed by
//! the routing and traffic components, and bounded polling for a first fix.

mod error;
pub mod filter;
mod locator;
mod source;
mod types;

pub use error::PositionError;
pub use filter::{SampleFilter, SampleFilterConfig};
pub use locator::{wait_for_position, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use source::{PositionHub, PositionSource, DEFAULT_EVENT_CAPACITY};
pub use types::{AuthorizationStatus, Heading, Position, PositionEvent};

//! Composition root.
//!
//! [`NavigationApp`] wires one directions provider and one position source
//! into the route session, the traffic simulator, the per-mode comparator
//! and the saved trips manager, and owns their background tasks.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── NavigationApp ─────────────────────────────┐
//! │                                                                          │
//! │  PositionSource ──► RouteSession ──► RequestQueue ──► DirectionsProvider │
//! │        │                 ▲                                   ▲           │
//! │        │           (SavedTripsManager)                       │           │
//! │        └──────────► TrafficSimulator ────────────────────────┤           │
//! │                     (refresh timer)                          │           │
//! │                                        RouteOptions ─────────┘           │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{connect_provider, AppDependencies, NavigationApp};
pub use config::AppConfig;
pub use error::AppError;

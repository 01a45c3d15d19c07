//! Flowcast - turn-by-turn routing with synthetic traffic.
//!
//! The crate is the navigation core behind a map client: it serializes
//! directions requests against a rate-limited provider, keeps a single
//! route session (candidates, selection, step-by-step guidance), and
//! samples routes around a focal point to render plausible congestion.
//!
//! # Modules
//!
//! - [`routing`]: request queue with rate-limit backoff, route session, per-mode comparator
//! - [`traffic`]: synthetic congestion segments and the five-day forecast
//! - [`position`]: device position and heading feed
//! - [`provider`]: directions provider trait, OSRM client and a scripted provider
//! - [`trips`]: saved trips for the signed-in user
//! - [`coord`]: coordinates and geodesic helpers
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing subscriber setup
//! - [`app`]: composition root

pub mod app;
pub mod config;
pub mod coord;
pub mod logging;
pub mod position;
pub mod provider;
pub mod routing;
pub mod traffic;
pub mod trips;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

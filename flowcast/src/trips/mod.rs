//! Saved trips
//!
//! Favorite trips persisted through a [`TripStore`] and mirrored per user by
//! the [`SavedTripsManager`]. Storage and identity are external; the in-memory
//! implementations here back tests and the CLI.

mod identity;
mod manager;
mod store;
mod types;

pub use identity::{IdentityProvider, StaticIdentity};
pub use manager::{SavedTripsManager, TripsState};
pub use store::{MemoryTripStore, TripStore};
pub use types::{SavedTrip, TripEndpoint, TripStoreError};

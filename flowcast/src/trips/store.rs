//! Trip storage trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::{SavedTrip, TripStoreError};
use crate::provider::BoxFuture;

/// Keyed record store with live per-user subscriptions.
pub trait TripStore: Send + Sync {
    /// Live view of a user's trips, newest first.
    fn subscribe_trips(&self, user_id: &str) -> watch::Receiver<Vec<SavedTrip>>;

    /// Persist a trip and return its id. An empty id is assigned by the store.
    fn save(&self, trip: SavedTrip) -> BoxFuture<'_, Result<String, TripStoreError>>;

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), TripStoreError>>;

    /// Flip the frequently-used flag and return its new value.
    fn toggle_favorite<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, TripStoreError>>;
}

#[derive(Default)]
struct StoreState {
    trips: HashMap<String, SavedTrip>,
    watchers: HashMap<String, watch::Sender<Vec<SavedTrip>>>,
}

impl StoreState {
    fn user_trips(&self, user_id: &str) -> Vec<SavedTrip> {
        let mut trips: Vec<SavedTrip> = self
            .trips
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        trips
    }

    fn publish(&self, user_id: &str) {
        if let Some(sender) = self.watchers.get(user_id) {
            sender.send_replace(self.user_trips(user_id));
        }
    }
}

/// In-process [`TripStore`].
#[derive(Default)]
pub struct MemoryTripStore {
    state: Mutex<StoreState>,
    next_id: AtomicU64,
}

impl MemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save_sync(&self, mut trip: SavedTrip) -> Result<String, TripStoreError> {
        if trip.user_id.is_empty() {
            return Err(TripStoreError::Save);
        }
        if trip.id.is_empty() {
            trip.id = format!("trip-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        }
        let id = trip.id.clone();
        let user_id = trip.user_id.clone();

        let mut state = self.state.lock();
        state.trips.insert(id.clone(), trip);
        state.publish(&user_id);
        debug!(id = %id, "Trip saved");
        Ok(id)
    }

    fn delete_sync(&self, id: &str) -> Result<(), TripStoreError> {
        let mut state = self.state.lock();
        let trip = state
            .trips
            .remove(id)
            .ok_or_else(|| TripStoreError::NotFound(id.to_string()))?;
        state.publish(&trip.user_id);
        Ok(())
    }

    fn toggle_sync(&self, id: &str) -> Result<bool, TripStoreError> {
        let mut state = self.state.lock();
        let trip = state
            .trips
            .get_mut(id)
            .ok_or_else(|| TripStoreError::NotFound(id.to_string()))?;
        trip.frequently_used = !trip.frequently_used;
        let flag = trip.frequently_used;
        let user_id = trip.user_id.clone();
        state.publish(&user_id);
        Ok(flag)
    }
}

impl TripStore for MemoryTripStore {
    fn subscribe_trips(&self, user_id: &str) -> watch::Receiver<Vec<SavedTrip>> {
        let mut state = self.state.lock();
        let current = state.user_trips(user_id);
        state
            .watchers
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(current).0)
            .subscribe()
    }

    fn save(&self, trip: SavedTrip) -> BoxFuture<'_, Result<String, TripStoreError>> {
        let result = self.save_sync(trip);
        Box::pin(async move { result })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), TripStoreError>> {
        let result = self.delete_sync(id);
        Box::pin(async move { result })
    }

    fn toggle_favorite<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, TripStoreError>> {
        let result = self.toggle_sync(id);
        Box::pin(async move { result })
    }
}

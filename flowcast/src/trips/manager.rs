//! Saved trips for the signed-in user.
//!
//! Mirrors the store's live subscription into a [`TripsState`] with the full
//! list (newest first) and the derived frequently-used list.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{IdentityProvider, SavedTrip, TripEndpoint, TripStore, TripStoreError};

/// Published trip lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripsState {
    pub saved: Vec<SavedTrip>,
    pub frequent: Vec<SavedTrip>,
}

impl TripsState {
    fn from_saved(saved: Vec<SavedTrip>) -> Self {
        let frequent = saved.iter().filter(|t| t.frequently_used).cloned().collect();
        Self { saved, frequent }
    }
}

/// Manages the current user's saved trips.
pub struct SavedTripsManager {
    store: Arc<dyn TripStore>,
    identity: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<TripsState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SavedTripsManager {
    pub fn new(store: Arc<dyn TripStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(TripsState::default());
        Self {
            store,
            identity,
            state: Arc::new(state),
            listener: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TripsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TripsState> {
        self.state.subscribe()
    }

    fn user_id(&self) -> Result<String, TripStoreError> {
        self.identity
            .current_user_id()
            .ok_or(TripStoreError::NotSignedIn)
    }

    /// Start mirroring the current user's trips. Replaces any previous listener.
    pub fn start_listening(&self) -> Result<(), TripStoreError> {
        let user_id = self.user_id()?;
        let mut trips = self.store.subscribe_trips(&user_id);
        self.state
            .send_replace(TripsState::from_saved(trips.borrow_and_update().clone()));

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            while trips.changed().await.is_ok() {
                let saved = trips.borrow_and_update().clone();
                debug!(count = saved.len(), "Saved trips updated");
                state.send_replace(TripsState::from_saved(saved));
            }
        });

        if let Some(previous) = self.listener.lock().replace(handle) {
            previous.abort();
        }
        info!(user = %user_id, "Listening for saved trips");
        Ok(())
    }

    /// Stop mirroring and clear the lists.
    pub fn stop_listening(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
        self.state.send_replace(TripsState::default());
    }

    /// Save a trip for the current user.
    pub async fn save_trip(
        &self,
        name: impl Into<String>,
        source: TripEndpoint,
        destination: TripEndpoint,
    ) -> Result<String, TripStoreError> {
        let user_id = self.user_id()?;
        let trip = SavedTrip::new(user_id, name, source, destination);
        self.store.save(trip).await.map_err(|e| {
            warn!(error = %e, "Failed to save trip");
            TripStoreError::Save
        })
    }

    pub async fn delete_trip(&self, id: &str) -> Result<(), TripStoreError> {
        self.store.delete(id).await.map_err(|e| {
            warn!(id, error = %e, "Failed to delete trip");
            TripStoreError::Delete
        })
    }

    /// Flip the frequently-used flag of a trip in the current list.
    pub async fn toggle_frequent(&self, id: &str) -> Result<bool, TripStoreError> {
        if !self.state.borrow().saved.iter().any(|t| t.id == id) {
            return Err(TripStoreError::Update);
        }
        self.store.toggle_favorite(id).await.map_err(|e| {
            warn!(id, error = %e, "Failed to toggle frequent flag");
            TripStoreError::Update
        })
    }
}

impl Drop for SavedTripsManager {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

//! Position source trait and the in-process hub implementation.
//!
//! # Architecture
//!
//! ```text
//! platform sensor ──ingest_*──► PositionHub ──filter──► broadcast::Sender
//!                                   │                       │
//!                                   │ latest_*()            ├──► RouteSession
//!                                   ▼                       ├──► RequestQueue (polling)
//!                             last accepted sample          └──► TrafficSimulator
//! ```
//!
//! Consumers hold an `Arc<dyn PositionSource>` and never own the sensor.

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::filter::{SampleFilter, SampleFilterConfig};
use super::{AuthorizationStatus, Heading, Position, PositionError, PositionEvent};

/// Default broadcast capacity for position events.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Read side of the device location sensor.
pub trait PositionSource: Send + Sync {
    /// Subscribe to filtered position, heading and authorization events.
    fn subscribe(&self) -> broadcast::Receiver<PositionEvent>;

    /// Most recent accepted position, if any.
    fn latest_position(&self) -> Option<Position>;

    /// Most recent accepted heading, if any.
    fn latest_heading(&self) -> Option<Heading>;

    /// Current permission state.
    fn authorization(&self) -> AuthorizationStatus;

    /// Ask the platform to prompt for permission. Returns the state at the time
    /// of the call; a later `Authorization` event reports the answer.
    fn request_permission(&self) -> AuthorizationStatus;
}

struct HubState {
    filter: SampleFilter,
    authorization: AuthorizationStatus,
    last_error: Option<PositionError>,
    permission_requests: u32,
}

/// In-process [`PositionSource`] fed by a platform adapter (or by tests).
pub struct PositionHub {
    state: Mutex<HubState>,
    events: broadcast::Sender<PositionEvent>,
}

impl PositionHub {
    /// Create a hub with default filter thresholds and authorization undetermined.
    pub fn new() -> Self {
        Self::with_config(SampleFilterConfig::default(), DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_config(filter: SampleFilterConfig, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(HubState {
                filter: SampleFilter::new(filter),
                authorization: AuthorizationStatus::NotDetermined,
                last_error: None,
                permission_requests: 0,
            }),
            events,
        }
    }

    /// Create a hub that already has permission granted.
    pub fn granted() -> Self {
        let hub = Self::new();
        hub.set_authorization(AuthorizationStatus::Granted);
        hub
    }

    /// Feed a raw position sample. Returns true if it passed the filter.
    pub fn ingest_position(&self, position: Position) -> bool {
        let accepted = {
            let mut state = self.state.lock();
            let accepted = state.filter.accept_position(&position);
            if accepted {
                state.last_error = None;
            }
            accepted
        };

        if accepted {
            debug!(
                lat = position.coordinate.latitude,
                lon = position.coordinate.longitude,
                accuracy = position.horizontal_accuracy,
                "Position accepted"
            );
            self.publish(PositionEvent::Position(position));
        }
        accepted
    }

    /// Feed a raw heading sample. Returns true if it passed the filter.
    pub fn ingest_heading(&self, heading: Heading) -> bool {
        let accepted = self.state.lock().filter.accept_heading(&heading);
        if accepted {
            self.publish(PositionEvent::Heading(heading));
        }
        accepted
    }

    /// Record a permission change from the platform.
    ///
    /// Denial clears the remembered position and heading and records
    /// [`PositionError::AuthorizationDenied`].
    pub fn set_authorization(&self, status: AuthorizationStatus) {
        {
            let mut state = self.state.lock();
            if state.authorization == status {
                return;
            }
            state.authorization = status;
            match status {
                AuthorizationStatus::Denied => {
                    state.filter.reset();
                    state.last_error = Some(PositionError::AuthorizationDenied);
                }
                AuthorizationStatus::NotDetermined => state.filter.reset(),
                AuthorizationStatus::Granted => state.last_error = None,
            }
        }

        info!(status = ?status, "Location authorization changed");
        self.publish(PositionEvent::Authorization(status));
    }

    /// Record a sensor failure.
    pub fn report_failure(&self, error: PositionError) {
        warn!(error = %error, "Location sensor failure");
        self.state.lock().last_error = Some(error.clone());
        self.publish(PositionEvent::Failed(error));
    }

    /// Last failure reported by the sensor, cleared by the next accepted fix.
    pub fn last_error(&self) -> Option<PositionError> {
        self.state.lock().last_error.clone()
    }

    /// Number of permission prompts requested so far.
    pub fn permission_requests(&self) -> u32 {
        self.state.lock().permission_requests
    }

    fn publish(&self, event: PositionEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }
}

impl Default for PositionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for PositionHub {
    fn subscribe(&self) -> broadcast::Receiver<PositionEvent> {
        self.events.subscribe()
    }

    fn latest_position(&self) -> Option<Position> {
        self.state.lock().filter.last_position().cloned()
    }

    fn latest_heading(&self) -> Option<Heading> {
        self.state.lock().filter.last_heading().cloned()
    }

    fn authorization(&self) -> AuthorizationStatus {
        self.state.lock().authorization
    }

    fn request_permission(&self) -> AuthorizationStatus {
        let status = {
            let mut state = self.state.lock();
            if state.authorization == AuthorizationStatus::NotDetermined {
                state.permission_requests += 1;
            }
            state.authorization
        };
        if status == AuthorizationStatus::NotDetermined {
            self.publish(PositionEvent::PermissionRequested);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_publishes_accepted_positions() {
        let hub = PositionHub::granted();
        let mut rx = hub.subscribe();

        assert!(hub.ingest_position(Position::new(37.0, -122.0, 5.0)));
        assert!(!hub.ingest_position(Position::new(37.0, -122.0, 5.0)));

        match rx.try_recv() {
            Ok(PositionEvent::Position(p)) => assert_eq!(p.coordinate.latitude, 37.0),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_latest_position_tracks_filter() {
        let hub = PositionHub::granted();
        assert!(hub.latest_position().is_none());
        hub.ingest_position(Position::new(37.0, -122.0, 5.0));
        assert_eq!(hub.latest_position().unwrap().coordinate.latitude, 37.0);
    }

    #[test]
    fn test_denial_clears_samples() {
        let hub = PositionHub::granted();
        hub.ingest_position(Position::new(37.0, -122.0, 5.0));
        hub.ingest_heading(Heading::new(90.0, 5.0));

        hub.set_authorization(AuthorizationStatus::Denied);

        assert!(hub.latest_position().is_none());
        assert!(hub.latest_heading().is_none());
        assert_eq!(hub.last_error(), Some(PositionError::AuthorizationDenied));
    }

    #[test]
    fn test_request_permission_only_prompts_when_undetermined() {
        let hub = PositionHub::new();
        let mut rx = hub.subscribe();

        assert_eq!(hub.request_permission(), AuthorizationStatus::NotDetermined);
        assert_eq!(hub.permission_requests(), 1);
        assert_eq!(rx.try_recv().unwrap(), PositionEvent::PermissionRequested);

        hub.set_authorization(AuthorizationStatus::Granted);
        assert_eq!(hub.request_permission(), AuthorizationStatus::Granted);
        assert_eq!(hub.permission_requests(), 1);
    }

    #[test]
    fn test_report_failure_is_cleared_by_next_fix() {
        let hub = PositionHub::granted();
        hub.report_failure(PositionError::LocationUnavailable);
        assert_eq!(hub.last_error(), Some(PositionError::LocationUnavailable));
        hub.ingest_position(Position::new(37.0, -122.0, 5.0));
        assert_eq!(hub.last_error(), None);
    }
}

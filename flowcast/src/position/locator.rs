//! Bounded polling for the current device position.

use std::time::Duration;

use tracing::{debug, warn};

use super::{Position, PositionError, PositionSource};

/// Default number of polling attempts.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 20;

/// Default interval between polling attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wait for the source to report a position, polling `attempts` times.
///
/// Returns immediately if a position is already known. Fails with
/// [`PositionError::AuthorizationDenied`] when permission is denied and
/// [`PositionError::LocationUnavailable`] when polling is exhausted.
pub async fn wait_for_position(
    source: &dyn PositionSource,
    attempts: u32,
    interval: Duration,
) -> Result<Position, PositionError> {
    for attempt in 0..attempts.max(1) {
        if let Some(position) = source.latest_position() {
            if attempt > 0 {
                debug!(attempt, "Position became available");
            }
            return Ok(position);
        }
        if source.authorization() == super::AuthorizationStatus::Denied {
            return Err(PositionError::AuthorizationDenied);
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    warn!(attempts, "Gave up waiting for a position fix");
    Err(PositionError::LocationUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{AuthorizationStatus, PositionHub};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_returns_known_position_immediately() {
        let hub = PositionHub::granted();
        hub.ingest_position(Position::new(37.0, -122.0, 5.0));

        let start = tokio::time::Instant::now();
        let p = wait_for_position(&hub, 20, DEFAULT_POLL_INTERVAL)
            .await
            .unwrap();
        assert_eq!(p.coordinate.latitude, 37.0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_all_attempts() {
        let hub = PositionHub::granted();
        let start = tokio::time::Instant::now();
        let result = wait_for_position(&hub, 20, DEFAULT_POLL_INTERVAL).await;
        assert_eq!(result, Err(PositionError::LocationUnavailable));
        // 19 sleeps between 20 checks
        assert_eq!(start.elapsed(), Duration::from_millis(1900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_picks_up_late_fix() {
        let hub = Arc::new(PositionHub::granted());
        let feeder = Arc::clone(&hub);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            feeder.ingest_position(Position::new(1.0, 2.0, 5.0));
        });

        let p = wait_for_position(hub.as_ref(), 20, DEFAULT_POLL_INTERVAL)
            .await
            .unwrap();
        assert_eq!(p.coordinate.longitude, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_fails_fast() {
        let hub = PositionHub::new();
        hub.set_authorization(AuthorizationStatus::Denied);
        let result = wait_for_position(&hub, 20, DEFAULT_POLL_INTERVAL).await;
        assert_eq!(result, Err(PositionError::AuthorizationDenied));
    }
}

//! End-to-end tests of the route session over the request queue.
//!
//! Time is paused, so backoff delays and cooldowns are observed exactly on
//! the tokio clock recorded by the scripted provider.

use std::sync::Arc;
use std::time::Duration;

use flowcast::coord::Coordinate;
use flowcast::position::{AuthorizationStatus, Position, PositionHub};
use flowcast::provider::{straight_line_route, DirectionsError, ScriptedDirectionsProvider};
use flowcast::routing::{
    Destination, RequestQueue, RequestQueueConfig, RequestStatus, RouteError, RouteSession,
    RouteSessionConfig, SessionPhase, SessionState, RETRYING_MESSAGE,
};
use tokio_util::sync::CancellationToken;

const START: Coordinate = Coordinate::new(51.5007, -0.1246);
const MUSEUM: Coordinate = Coordinate::new(51.5194, -0.1270);
const BRIDGE: Coordinate = Coordinate::new(51.5055, -0.0754);

struct Fixture {
    session: RouteSession,
    hub: Arc<PositionHub>,
    provider: Arc<ScriptedDirectionsProvider>,
    shutdown: CancellationToken,
}

fn fixture() -> Fixture {
    let hub = Arc::new(PositionHub::granted());
    hub.ingest_position(Position::at(START));
    let provider = Arc::new(ScriptedDirectionsProvider::new());
    let shutdown = CancellationToken::new();
    let (queue, _worker) = RequestQueue::spawn(
        RequestQueueConfig::default(),
        provider.clone(),
        hub.clone(),
        shutdown.clone(),
    );
    let session = RouteSession::new(RouteSessionConfig::default(), queue, hub.clone());
    Fixture {
        session,
        hub,
        provider,
        shutdown,
    }
}

async fn settled(session: &RouteSession) -> SessionState {
    let mut rx = session.subscribe();
    let state = rx.wait_for(|s| !s.is_calculating).await.unwrap().clone();
    state
}

fn rate_limited(hint_secs: Option<u64>) -> DirectionsError {
    DirectionsError::RateLimited {
        retry_after: hint_secs.map(Duration::from_secs),
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_with_hint_retries_after_padding() {
    let f = fixture();
    f.provider.push_error(rate_limited(Some(2)));
    f.provider.push_routes(vec![
        straight_line_route(START, MUSEUM, 2),
        straight_line_route(START, MUSEUM, 4),
    ]);

    f.session
        .set_destination(Destination::named("Museum", MUSEUM))
        .unwrap();

    let mut rx = f.session.subscribe();
    let retrying = rx
        .wait_for(|s| matches!(s.request_status, RequestStatus::Retrying { .. }))
        .await
        .unwrap()
        .clone();
    assert_eq!(
        retrying.request_status,
        RequestStatus::Retrying {
            attempt: 1,
            delay: Duration::from_secs(3)
        }
    );
    assert_eq!(retrying.status_message().as_deref(), Some(RETRYING_MESSAGE));
    assert!(retrying.is_calculating);

    let state = settled(&f.session).await;
    assert_eq!(state.phase(), SessionPhase::RoutesAvailable);
    assert_eq!(state.available_routes.len(), 2);
    assert!(state.route_error.is_none());
    assert_eq!(state.request_status, RequestStatus::Idle);

    let calls = f.provider.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].at - calls[0].at, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_without_hint_waits_fallback() {
    let f = fixture();
    f.provider.push_error(rate_limited(None));
    f.provider
        .push_routes(vec![straight_line_route(START, MUSEUM, 2)]);

    f.session.set_destination(Destination::new(MUSEUM)).unwrap();
    let state = settled(&f.session).await;
    assert_eq!(state.available_routes.len(), 1);

    let calls = f.provider.calls();
    assert_eq!(calls[1].at - calls[0].at, Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_long_hint_is_capped() {
    let f = fixture();
    f.provider.push_error(rate_limited(Some(30)));
    f.provider
        .push_routes(vec![straight_line_route(START, MUSEUM, 2)]);

    f.session.set_destination(Destination::new(MUSEUM)).unwrap();
    settled(&f.session).await;

    let calls = f.provider.calls();
    assert_eq!(calls[1].at - calls[0].at, Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_terminal_after_three_retries() {
    let f = fixture();
    for _ in 0..4 {
        f.provider.push_error(rate_limited(Some(1)));
    }

    f.session.set_destination(Destination::new(MUSEUM)).unwrap();
    let state = settled(&f.session).await;

    assert!(matches!(state.route_error, Some(RouteError::Provider { .. })));
    assert_eq!(
        state.status_message().as_deref(),
        Some("Unable to calculate route. Please try again.")
    );
    assert_eq!(state.phase(), SessionPhase::Idle);
    assert_eq!(f.provider.call_count(), 4);
    assert_eq!(f.provider.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_later_destination_wins_over_slow_response() {
    let f = fixture();
    f.provider.push_with_latency(
        Ok(vec![straight_line_route(START, MUSEUM, 2)]),
        Duration::from_secs(2),
    );
    f.provider
        .push_routes(vec![straight_line_route(START, BRIDGE, 5)]);

    f.session
        .set_destination(Destination::named("Museum", MUSEUM))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    f.session
        .set_destination(Destination::named("Bridge", BRIDGE))
        .unwrap();

    let state = settled(&f.session).await;
    assert_eq!(state.destination_name.as_deref(), Some("Bridge"));
    assert_eq!(state.available_routes.len(), 1);
    assert_eq!(state.available_routes[0].steps.len(), 6);

    // Nothing from the first request lands afterwards.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let later = f.session.state();
    assert_eq!(later.destination_name.as_deref(), Some("Bridge"));
    assert_eq!(later.available_routes[0].steps.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_queued_destinations_all_requested_latest_applied() {
    let f = fixture();
    f.provider.push_with_latency(
        Ok(vec![straight_line_route(START, MUSEUM, 2)]),
        Duration::from_secs(1),
    );
    f.provider
        .push_routes(vec![straight_line_route(START, BRIDGE, 3)]);
    f.provider
        .push_routes(vec![straight_line_route(START, BRIDGE, 5)]);

    f.session
        .set_destination(Destination::named("Museum", MUSEUM))
        .unwrap();
    f.session
        .set_destination(Destination::named("Bridge", BRIDGE))
        .unwrap();
    f.session
        .set_destination(Destination::named("Tower Bridge", BRIDGE))
        .unwrap();

    let state = settled(&f.session).await;
    assert_eq!(state.destination_name.as_deref(), Some("Tower Bridge"));
    assert_eq!(state.available_routes.len(), 1);
    assert_eq!(state.available_routes[0].steps.len(), 6);

    let calls = f.provider.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].request.destination, MUSEUM);
    assert_eq!(calls[1].request.destination, BRIDGE);
    assert_eq!(f.provider.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_routes_reported() {
    let f = fixture();
    f.provider.push_routes(Vec::new());

    f.session.set_destination(Destination::new(MUSEUM)).unwrap();
    let state = settled(&f.session).await;
    assert_eq!(state.route_error, Some(RouteError::NoRoutesFound));
    assert_eq!(
        state.status_message().as_deref(),
        Some("No routes found")
    );
}

#[tokio::test(start_paused = true)]
async fn test_denied_location_fails_request() {
    let f = fixture();
    f.hub.set_authorization(AuthorizationStatus::Denied);

    f.session.set_destination(Destination::new(MUSEUM)).unwrap();
    let state = settled(&f.session).await;

    assert!(state.route_error.is_some());
    assert_eq!(f.provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_guidance_through_arrival_and_reset() {
    let f = fixture();
    let listener = f.session.spawn_position_listener(f.shutdown.child_token());
    f.provider
        .push_routes(vec![straight_line_route(START, MUSEUM, 2)]);

    f.session
        .set_destination(Destination::named("Museum", MUSEUM))
        .unwrap();
    let state = settled(&f.session).await;
    let route = state.selected_route.clone().unwrap();
    assert!(f.session.start_navigation());

    let mut rx = f.session.subscribe();
    // 10 m from START, inside the radius of step 0's anchor.
    f.hub
        .ingest_position(Position::new(START.latitude + 0.00009, START.longitude, 5.0));
    rx.wait_for(|s| s.step_index() == 1).await.unwrap();

    f.hub
        .ingest_position(Position::at(route.steps[1].anchor().unwrap()));
    let at_last = rx.wait_for(|s| s.step_index() == 2).await.unwrap().clone();
    assert!(!at_last.arrived);
    assert_eq!(
        at_last.current_step.as_ref().map(|s| s.instruction.as_str()),
        Some("Arrive at destination")
    );
    assert!(!f.session.next_step());

    f.hub
        .ingest_position(Position::new(MUSEUM.latitude + 0.00005, MUSEUM.longitude, 5.0));
    let arrived = rx.wait_for(|s| s.arrived).await.unwrap().clone();
    assert!(arrived.is_navigating());
    assert_eq!(arrived.step_index(), 2);

    f.session.end_navigation();
    let reset = f.session.state();
    assert_eq!(reset.phase(), SessionPhase::Idle);
    assert!(reset.available_routes.is_empty());
    assert!(reset.selected_route.is_none());
    assert!(reset.destination_name.is_none());
    assert!(!reset.arrived);

    f.shutdown.cancel();
    listener.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_routes_ignored_while_navigating() {
    let f = fixture();
    f.provider
        .push_routes(vec![straight_line_route(START, MUSEUM, 2)]);
    f.provider
        .push_routes(vec![straight_line_route(START, BRIDGE, 3)]);

    f.session.set_destination(Destination::new(MUSEUM)).unwrap();
    let first = settled(&f.session).await;
    assert!(f.session.start_navigation());

    f.session.set_destination(Destination::new(BRIDGE)).unwrap();
    let after = settled(&f.session).await;

    assert!(after.is_navigating());
    assert!(Arc::ptr_eq(
        after.selected_route.as_ref().unwrap(),
        first.selected_route.as_ref().unwrap()
    ));
    assert_eq!(f.provider.call_count(), 2);
}

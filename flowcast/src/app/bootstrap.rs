//! `NavigationApp` wiring and lifecycle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::AppConfig;
use super::error::AppError;
use crate::config::ProviderSettings;
use crate::position::PositionSource;
use crate::provider::{DirectionsProvider, OsrmDirectionsProvider};
use crate::routing::{
    Destination, RequestQueue, RequestTicket, RouteError, RouteOptions, RouteSession,
};
use crate::traffic::TrafficSimulator;
use crate::trips::{IdentityProvider, SavedTrip, SavedTripsManager, TripStore, TripStoreError};

/// Collaborators the app does not own.
#[derive(Clone)]
pub struct AppDependencies {
    pub provider: Arc<dyn DirectionsProvider>,
    pub positions: Arc<dyn PositionSource>,
    pub trip_store: Arc<dyn TripStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Build the HTTP directions provider described by the settings.
pub fn connect_provider(
    settings: &ProviderSettings,
) -> Result<Arc<dyn DirectionsProvider>, AppError> {
    let provider = OsrmDirectionsProvider::connect(settings.base_url.clone(), settings.timeout)?;
    info!(base_url = %settings.base_url, "Directions provider ready");
    Ok(Arc::new(provider))
}

/// Route session, traffic simulator and saved trips sharing one provider
/// and one position source.
///
/// Owns the background tasks: the request queue worker, the traffic worker,
/// the traffic refresh timer and the session's position listener.
///
/// ```ignore
/// let app = NavigationApp::start(AppConfig::default(), deps);
/// app.search_destination(Destination::named("Office", office))?;
/// let mut rx = app.session().subscribe();
/// // ...
/// app.shutdown().await;
/// ```
pub struct NavigationApp {
    session: RouteSession,
    simulator: TrafficSimulator,
    trips: Arc<SavedTripsManager>,
    options: Arc<RouteOptions>,
    positions: Arc<dyn PositionSource>,
    shutdown: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl NavigationApp {
    /// Create every component and spawn its tasks on the current runtime.
    pub fn start(config: AppConfig, deps: AppDependencies) -> Self {
        let shutdown = CancellationToken::new();
        let mut tasks = Vec::with_capacity(4);

        let (queue, queue_task) = RequestQueue::spawn(
            config.queue,
            Arc::clone(&deps.provider),
            Arc::clone(&deps.positions),
            shutdown.child_token(),
        );
        tasks.push(("request queue", queue_task));

        let session = RouteSession::new(config.session, queue, Arc::clone(&deps.positions));
        tasks.push((
            "position listener",
            session.spawn_position_listener(shutdown.child_token()),
        ));

        let (simulator, traffic_worker) = TrafficSimulator::new(
            config.traffic,
            Arc::clone(&deps.provider),
            Arc::clone(&deps.positions),
        );
        tasks.push((
            "traffic worker",
            tokio::spawn(traffic_worker.run(shutdown.child_token())),
        ));
        tasks.push((
            "traffic timer",
            simulator.spawn_refresh_timer(shutdown.child_token()),
        ));

        let trips = Arc::new(SavedTripsManager::new(deps.trip_store, deps.identity));
        match trips.start_listening() {
            Ok(()) => {}
            Err(TripStoreError::NotSignedIn) => debug!("No signed-in user, saved trips idle"),
            Err(e) => warn!(error = %e, "Saved trips unavailable"),
        }

        let options = Arc::new(RouteOptions::new(deps.provider));

        info!(tasks = tasks.len(), "Navigation app started");

        Self {
            session,
            simulator,
            trips,
            options,
            positions: deps.positions,
            shutdown,
            tasks,
        }
    }

    pub fn session(&self) -> &RouteSession {
        &self.session
    }

    pub fn simulator(&self) -> &TrafficSimulator {
        &self.simulator
    }

    pub fn trips(&self) -> &Arc<SavedTripsManager> {
        &self.trips
    }

    pub fn options(&self) -> &Arc<RouteOptions> {
        &self.options
    }

    /// Request routes to a destination and generate traffic around it.
    pub fn search_destination(&self, destination: Destination) -> Result<RequestTicket, AppError> {
        self.simulator
            .generate_for_searched_location(destination.coordinate);
        Ok(self.session.set_destination(destination)?)
    }

    /// Seed a search from a saved trip's destination.
    pub fn navigate_to_saved_trip(&self, trip: &SavedTrip) -> Result<RequestTicket, AppError> {
        info!(trip = %trip.id, name = %trip.name, "Routing to saved trip");
        self.search_destination(trip.to_destination())
    }

    /// Compare travel modes from the current position to `destination`.
    pub async fn compare_modes(&self, destination: Destination) -> Result<(), AppError> {
        let source = self
            .positions
            .latest_position()
            .ok_or(RouteError::LocationUnavailable)?;
        self.options
            .calculate(source.coordinate, destination.coordinate)
            .await;
        Ok(())
    }

    /// Leave navigation, drop the searched location and stop traffic work.
    pub fn end_navigation(&self) {
        self.session.end_navigation();
        self.simulator.cancel_in_flight();
        self.simulator.clear_focal_point();
        self.options.clear();
    }

    /// Cancel every background task and wait for it to finish.
    pub async fn shutdown(self) {
        info!("Shutting down navigation app");
        self.trips.stop_listening();
        self.simulator.cancel_in_flight();
        self.shutdown.cancel();

        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                warn!(task = name, error = %e, "Task ended abnormally");
            } else {
                debug!(task = name, "Task stopped");
            }
        }
        info!("Navigation app shutdown complete");
    }
}

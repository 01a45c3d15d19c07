//! `flowcast route`: request routes from one point to another and optionally
//! replay guidance along the chosen route.

use std::sync::Arc;
use std::time::Duration;

use flowcast::app::{AppConfig, AppDependencies, NavigationApp};
use flowcast::coord::Coordinate;
use flowcast::position::{Position, PositionHub, PositionSource};
use flowcast::provider::DirectionsProvider;
use flowcast::routing::{
    Destination, RequestStatus, RouteOption, RouteSession, SessionState,
};
use flowcast::trips::{MemoryTripStore, StaticIdentity};
use tokio::sync::watch;
use tracing::debug;

use super::common::{format_distance, format_duration, route_summary};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Longest wait for the route request, retries included.
const ROUTE_TIMEOUT: Duration = Duration::from_secs(90);

/// Longest wait for the session to react to one simulated position.
const STEP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RouteArgs {
    pub from: Coordinate,
    pub to: Coordinate,
    pub name: Option<String>,
    /// Zero-based index of the route to navigate.
    pub select: usize,
    pub navigate: bool,
    pub compare: bool,
}

pub fn run(args: RouteArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("route");
    let provider = runner.provider()?;
    let config = AppConfig::from_config_file(runner.config());
    runner.block_on(run_session(config, provider, args))
}

async fn run_session(
    config: AppConfig,
    provider: Arc<dyn DirectionsProvider>,
    args: RouteArgs,
) -> Result<(), CliError> {
    let hub = Arc::new(PositionHub::granted());
    hub.ingest_position(Position::at(args.from));

    let deps = AppDependencies {
        provider,
        positions: hub.clone(),
        trip_store: Arc::new(MemoryTripStore::new()),
        identity: Arc::new(StaticIdentity::anonymous()),
    };
    let app = NavigationApp::start(config, deps);

    let result = drive(&app, &hub, &args).await;
    app.shutdown().await;
    result
}

async fn drive(app: &NavigationApp, hub: &PositionHub, args: &RouteArgs) -> Result<(), CliError> {
    let destination = match &args.name {
        Some(name) => Destination::named(name.clone(), args.to),
        None => Destination::new(args.to),
    };

    println!("Routing {} -> {}", args.from, args.to);
    app.search_destination(destination.clone())?;

    let state = wait_for_routes(app.session().subscribe()).await?;
    print_routes(&state);

    if args.compare {
        app.compare_modes(destination).await?;
        print_options(&app.options().options());
    }

    if !args.navigate {
        return Ok(());
    }

    let Some(route) = state.available_routes.get(args.select).cloned() else {
        return Err(CliError::Config(format!(
            "Route {} does not exist, {} available",
            args.select + 1,
            state.available_routes.len()
        )));
    };
    app.session().select_route(route);
    app.session().start_navigation();
    replay_guidance(app.session(), hub).await
}

/// Wait until the latest request settles, printing retry notices on the way.
async fn wait_for_routes(
    mut rx: watch::Receiver<SessionState>,
) -> Result<SessionState, CliError> {
    let deadline = tokio::time::sleep(ROUTE_TIMEOUT);
    tokio::pin!(deadline);
    let mut announced_attempt = 0;

    loop {
        {
            let state = rx.borrow_and_update();
            if let RequestStatus::Retrying { attempt, delay } = state.request_status {
                if attempt > announced_attempt {
                    announced_attempt = attempt;
                    println!(
                        "{} (attempt {} in {:.1}s)",
                        state.status_message().unwrap_or_default(),
                        attempt,
                        delay.as_secs_f64()
                    );
                }
            }
            if !state.is_calculating {
                if let Some(error) = &state.route_error {
                    return Err(error.clone().into());
                }
                if !state.available_routes.is_empty() {
                    return Ok(state.clone());
                }
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Err(CliError::Timeout("routes".to_string()));
                }
            }
            _ = &mut deadline => return Err(CliError::Timeout("routes".to_string())),
        }
    }
}

fn print_routes(state: &SessionState) {
    if let Some(name) = &state.destination_name {
        println!("Destination: {}", name);
    }
    println!("{} route(s):", state.available_routes.len());
    for (index, route) in state.available_routes.iter().enumerate() {
        println!("  {}. {}", index + 1, route_summary(route));
        if let Some(step) = route.first_step() {
            println!("     First: {}", step.instruction);
        }
        for notice in &route.advisory_notices {
            println!("     Note: {}", notice);
        }
    }
}

fn print_options(options: &[RouteOption]) {
    println!("By travel mode:");
    for option in options {
        let detail = match (&option.route, &option.error) {
            (Some(route), _) => route_summary(route),
            (None, Some(error)) => error.to_string(),
            (None, None) if !option.mode.is_supported() => "not available".to_string(),
            (None, None) => "no route".to_string(),
        };
        println!("  {:<10} {}", option.mode.label(), detail);
    }
}

/// Walk the selected route by feeding each step's anchor as the position.
async fn replay_guidance(session: &RouteSession, hub: &PositionHub) -> Result<(), CliError> {
    let state = session.state();
    let Some(route) = state.selected_route.clone() else {
        return Ok(());
    };
    let mut rx = session.subscribe();

    println!();
    println!("Guidance ({} steps):", route.steps.len());

    for (index, step) in route.steps.iter().enumerate() {
        println!(
            "  {:>2}. {} ({})",
            index + 1,
            step.instruction,
            format_distance(step.distance_m)
        );

        let position = match step.anchor() {
            Some(anchor) => Position::at(anchor),
            None => match hub.latest_position() {
                Some(position) => position,
                None => continue,
            },
        };
        // The hub drops samples within a few metres of the last one; hand
        // those to the session directly.
        if !hub.ingest_position(position.clone()) {
            debug!(step = index, "Position filtered, updating session directly");
            session.on_position_update(&position);
        }

        let advanced = tokio::time::timeout(
            STEP_TIMEOUT,
            rx.wait_for(|s| s.step_index() > index || s.arrived),
        )
        .await;
        match advanced {
            Ok(Ok(state)) if state.arrived => {
                let name = state
                    .destination_name
                    .clone()
                    .unwrap_or_else(|| "destination".to_string());
                println!(
                    "Arrived at {} (estimated {})",
                    name,
                    format_duration(route.total_duration)
                );
                return Ok(());
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) | Err(_) => {
                return Err(CliError::Timeout(format!("step {} to complete", index + 1)));
            }
        }
    }
    Ok(())
}

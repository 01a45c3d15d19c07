//! `flowcast traffic`: run one generation cycle around a point.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use flowcast::app::AppConfig;
use flowcast::coord::Coordinate;
use flowcast::position::PositionHub;
use flowcast::traffic::{CongestionLevel, TrafficSegment, TrafficSimulator, TrafficState};
use tokio_util::sync::CancellationToken;

use super::common::congestion_marker;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Longest wait for one generation cycle.
const CYCLE_TIMEOUT: Duration = Duration::from_secs(120);

pub struct TrafficArgs {
    pub at: Coordinate,
    pub seed: Option<u64>,
    /// Print every segment instead of the summary only.
    pub verbose: bool,
}

pub fn run(args: TrafficArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("traffic");
    let provider = runner.provider()?;

    let mut config = AppConfig::from_config_file(runner.config());
    if let Some(seed) = args.seed {
        config = config.with_traffic_seed(seed);
    }

    runner.block_on(async move {
        let shutdown = CancellationToken::new();
        let positions = Arc::new(PositionHub::granted());
        let (simulator, worker) = TrafficSimulator::new(config.traffic, provider, positions);
        let worker = tokio::spawn(worker.run(shutdown.clone()));

        println!("Generating traffic around {}", args.at);
        simulator.generate_for_searched_location(args.at);

        let mut rx = simulator.subscribe();
        let result = tokio::time::timeout(CYCLE_TIMEOUT, rx.wait_for(|s| s.cycles_completed > 0))
            .await
            .map_err(|_| CliError::Timeout("traffic generation".to_string()))
            .map(|_| simulator.state());

        shutdown.cancel();
        let _ = worker.await;

        let state = result?;
        print_state(&state, args.verbose);
        Ok(())
    })
}

fn print_state(state: &TrafficState, verbose: bool) {
    if state.rate_limited {
        println!("Provider rate limit hit, showing partial results");
    }
    println!("{} segment(s)", state.segments.len());

    for (level, count) in level_counts(&state.segments) {
        println!("  {} {:<9} {}", congestion_marker(level), level.label(), count);
    }

    let vehicles: u32 = state.segments.iter().map(|s| s.vehicle_count).sum();
    println!("  {} vehicle marker(s)", vehicles);

    if verbose {
        println!();
        for (index, segment) in state.segments.iter().enumerate() {
            let (Some(start), Some(end)) = (segment.coordinates.first(), segment.coordinates.last())
            else {
                continue;
            };
            println!(
                "  {:>3}. {} {} -> {} ({} vehicles)",
                index + 1,
                congestion_marker(segment.congestion_level),
                start,
                end,
                segment.vehicle_count
            );
        }
    }
}

fn level_counts(segments: &[TrafficSegment]) -> BTreeMap<CongestionLevel, usize> {
    let mut counts = BTreeMap::new();
    for level in CongestionLevel::ALL {
        counts.insert(level, 0);
    }
    for segment in segments {
        *counts.entry(segment.congestion_level).or_insert(0) += 1;
    }
    counts
}

//! Traffic simulator: queued, debounced segment generation plus forecast.
//!
//! # Architecture
//!
//! ```text
//! refresh timer (120s) ──► refresh() ──debounce──┐
//!                                                ├──► mpsc ──► TrafficWorker
//! generate_for_searched_location(c) ─cancel──────┘               │
//!                                                                ├─ epoch check
//!                                                                ├─ SegmentGenerator
//!                                                                └─ watch<TrafficState>
//! ```
//!
//! Only one generation runs at a time. Jobs carry the epoch at which they were
//! submitted; `cancel_in_flight` bumps the epoch so older jobs are skipped and
//! their results discarded.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::forecast::{build_forecast, DEFAULT_FORECAST_DAYS};
use super::generator::{GeneratorConfig, SegmentGenerator};
use super::{CongestionSampler, CongestionWeights, TrafficPrediction, TrafficSegment, DEFAULT_VEHICLE_RANGE};
use crate::coord::Coordinate;
use crate::position::PositionSource;
use crate::provider::DirectionsProvider;

// =============================================================================
// Configuration
// =============================================================================

/// Default period of the refresh timer.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(120);

/// Default minimum time between timer-driven generations.
pub const DEFAULT_MIN_GENERATION_INTERVAL: Duration = Duration::from_secs(120);

/// Default pause between queued generation jobs.
pub const DEFAULT_INTER_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Configuration for the traffic simulator.
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    pub refresh_interval: Duration,
    pub min_generation_interval: Duration,
    pub inter_request_delay: Duration,
    pub generator: GeneratorConfig,
    pub weights: CongestionWeights,
    pub forecast_days: usize,
    /// Fixed RNG seed for reproducible output.
    pub seed: Option<u64>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            min_generation_interval: DEFAULT_MIN_GENERATION_INTERVAL,
            inter_request_delay: DEFAULT_INTER_REQUEST_DELAY,
            generator: GeneratorConfig::default(),
            weights: CongestionWeights::default(),
            forecast_days: DEFAULT_FORECAST_DAYS,
            seed: None,
        }
    }
}

/// Snapshot published by the simulator.
#[derive(Debug, Clone, Default)]
pub struct TrafficState {
    /// Replaced wholesale by every completed cycle.
    pub segments: Arc<Vec<TrafficSegment>>,
    /// Searched location overriding the device position, if any.
    pub focal_point: Option<Coordinate>,
    pub last_generated: Option<Instant>,
    pub cycles_completed: u64,
    pub is_generating: bool,
    /// The last cycle was cut short by a rate limit.
    pub rate_limited: bool,
    pub predictions: Vec<TrafficPrediction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Refresh,
    Search,
}

#[derive(Debug)]
struct GenerationJob {
    focal: Coordinate,
    trigger: Trigger,
    epoch: u64,
}

struct SimInner {
    config: TrafficConfig,
    generator: SegmentGenerator,
    provider: Arc<dyn DirectionsProvider>,
    positions: Arc<dyn PositionSource>,
    state: watch::Sender<TrafficState>,
    jobs: mpsc::UnboundedSender<GenerationJob>,
    epoch: AtomicU64,
    /// Jobs queued or running.
    outstanding: AtomicUsize,
    in_flight: Mutex<Option<CancellationToken>>,
    rng: Mutex<StdRng>,
}

/// Handle to the traffic simulator. Clones share the same simulator.
#[derive(Clone)]
pub struct TrafficSimulator {
    inner: Arc<SimInner>,
}

impl TrafficSimulator {
    /// Create the simulator and its worker. Run the worker with
    /// [`TrafficWorker::run`].
    pub fn new(
        config: TrafficConfig,
        provider: Arc<dyn DirectionsProvider>,
        positions: Arc<dyn PositionSource>,
    ) -> (Self, TrafficWorker) {
        let (jobs, rx) = mpsc::unbounded_channel();
        let sampler = CongestionSampler::new(config.weights.clone(), DEFAULT_VEHICLE_RANGE);
        let generator = SegmentGenerator::new(config.generator.clone(), sampler);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (state, _) = watch::channel(TrafficState::default());

        let inner = Arc::new(SimInner {
            config,
            generator,
            provider,
            positions,
            state,
            jobs,
            epoch: AtomicU64::new(0),
            outstanding: AtomicUsize::new(0),
            in_flight: Mutex::new(None),
            rng: Mutex::new(rng),
        });

        let simulator = Self { inner };
        simulator.refresh_forecast(Local::now().date_naive());

        let worker = TrafficWorker {
            inner: Arc::clone(&simulator.inner),
            rx,
        };
        (simulator, worker)
    }

    pub fn state(&self) -> TrafficState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrafficState> {
        self.inner.state.subscribe()
    }

    /// Timer-driven generation around the searched location or the device.
    ///
    /// No-op if the last generation is younger than the minimum interval, a
    /// job is already pending, or no focal point is known. Returns whether a
    /// job was scheduled.
    pub fn refresh(&self) -> bool {
        let focal = {
            let state = self.inner.state.borrow();
            if let Some(last) = state.last_generated {
                let age = last.elapsed();
                if age < self.inner.config.min_generation_interval {
                    debug!(age_ms = age.as_millis() as u64, "Traffic refresh skipped, generated recently");
                    return false;
                }
            }
            state.focal_point
        };

        if self.inner.outstanding.load(Ordering::SeqCst) > 0 {
            debug!("Traffic refresh skipped, generation pending");
            return false;
        }

        let Some(focal) = focal.or_else(|| {
            self.inner
                .positions
                .latest_position()
                .map(|p| p.coordinate)
        }) else {
            debug!("Traffic refresh skipped, no focal point");
            return false;
        };

        self.submit(focal, Trigger::Refresh)
    }

    /// Generate around a searched location right away.
    ///
    /// Cancels any in-flight generation and bypasses the refresh interval.
    pub fn generate_for_searched_location(&self, location: Coordinate) -> bool {
        self.cancel_in_flight();
        self.inner
            .state
            .send_modify(|s| s.focal_point = Some(location));
        self.submit(location, Trigger::Search)
    }

    /// Forget the searched location; refreshes follow the device again.
    pub fn clear_focal_point(&self) {
        self.inner
            .state
            .send_if_modified(|s| s.focal_point.take().is_some());
    }

    /// Cancel the running generation and skip every queued job.
    pub fn cancel_in_flight(&self) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(token) = self.inner.in_flight.lock().take() {
            debug!(epoch, "Cancelling in-flight traffic generation");
            token.cancel();
        }
    }

    /// Rebuild the forecast starting at `today`.
    pub fn refresh_forecast(&self, today: NaiveDate) {
        let predictions = {
            let mut rng = self.inner.rng.lock();
            build_forecast(
                today,
                self.inner.config.forecast_days,
                self.inner.generator.sampler(),
                &mut *rng,
            )
        };
        self.inner
            .state
            .send_modify(|s| s.predictions = predictions);
    }

    /// Spawn the periodic refresh timer. The first tick fires immediately.
    pub fn spawn_refresh_timer(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let simulator = self.clone();
        let period = self.inner.config.refresh_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        simulator.refresh();
                    }
                }
            }
            debug!("Traffic refresh timer stopped");
        })
    }

    fn submit(&self, focal: Coordinate, trigger: Trigger) -> bool {
        let job = GenerationJob {
            focal,
            trigger,
            epoch: self.inner.epoch.load(Ordering::SeqCst),
        };
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.inner.jobs.send(job).is_err() {
            self.inner.outstanding.fetch_sub(1, Ordering::SeqCst);
            debug!("Traffic worker stopped, job dropped");
            return false;
        }
        debug!(trigger = ?trigger, focal = %focal, "Traffic generation queued");
        true
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Runs generation jobs one at a time.
pub struct TrafficWorker {
    inner: Arc<SimInner>,
    rx: mpsc::UnboundedReceiver<GenerationJob>,
}

impl TrafficWorker {
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Traffic simulator starting");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let contacted_provider = self.run_job(job, &shutdown).await;
            let remaining = self.inner.outstanding.fetch_sub(1, Ordering::SeqCst) - 1;

            if contacted_provider && remaining > 0 {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.inner.config.inter_request_delay) => {}
                }
            }
        }

        info!("Traffic simulator stopped");
    }

    async fn run_job(&self, job: GenerationJob, shutdown: &CancellationToken) -> bool {
        let inner = &self.inner;
        if job.epoch != inner.epoch.load(Ordering::SeqCst) {
            debug!(trigger = ?job.trigger, "Skipping superseded traffic job");
            return false;
        }

        let token = shutdown.child_token();
        *inner.in_flight.lock() = Some(token.clone());
        // cancel_in_flight bumps the epoch before taking the token
        if job.epoch != inner.epoch.load(Ordering::SeqCst) {
            inner.in_flight.lock().take();
            return false;
        }

        inner.state.send_modify(|s| s.is_generating = true);
        let started = Instant::now();
        let outcome = inner
            .generator
            .collect_routes(inner.provider.as_ref(), job.focal, &token)
            .await;
        inner.in_flight.lock().take();

        if outcome.cancelled || job.epoch != inner.epoch.load(Ordering::SeqCst) {
            debug!(trigger = ?job.trigger, "Traffic generation cancelled");
            inner.state.send_modify(|s| s.is_generating = false);
            return true;
        }

        let segments = {
            let mut rng = inner.rng.lock();
            inner.generator.build_segments(&outcome.routes, &mut *rng)
        };

        info!(
            trigger = ?job.trigger,
            segments = segments.len(),
            requests = outcome.requests_sent,
            failed = outcome.failed_requests,
            rate_limited = outcome.rate_limited,
            duration_ms = started.elapsed().as_millis() as u64,
            "Traffic generation complete"
        );

        inner.state.send_modify(|s| {
            s.is_generating = false;
            s.rate_limited = outcome.rate_limited;
            // Keep the previous picture if a rate limit left us with nothing.
            if !(outcome.rate_limited && segments.is_empty()) {
                s.segments = Arc::new(segments);
            }
            s.last_generated = Some(Instant::now());
            s.cycles_completed += 1;
        });
        true
    }
}

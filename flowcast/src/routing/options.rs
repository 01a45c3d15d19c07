//! Per-mode route comparison.
//!
//! Asks the provider for one route per travel mode so the UI can show
//! "car 12 min / walk 45 min" side by side. Independent of the request queue:
//! calls run concurrently and results land as they arrive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info};

use super::RouteError;
use crate::coord::Coordinate;
use crate::provider::{DirectionsProvider, Route, RouteRequest, TransportMode};

/// Travel modes offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelMode {
    Car,
    Transit,
    Walk,
    Bike,
    Rideshare,
}

impl TravelMode {
    pub const ALL: [TravelMode; 5] = [
        TravelMode::Car,
        TravelMode::Transit,
        TravelMode::Walk,
        TravelMode::Bike,
        TravelMode::Rideshare,
    ];

    /// Provider mode used for this travel mode.
    pub fn transport_mode(&self) -> TransportMode {
        match self {
            TravelMode::Car | TravelMode::Rideshare => TransportMode::Automobile,
            TravelMode::Transit => TransportMode::Transit,
            TravelMode::Walk | TravelMode::Bike => TransportMode::Walking,
        }
    }

    /// Whether the provider can produce a meaningful route for this mode.
    pub fn is_supported(&self) -> bool {
        !matches!(self, TravelMode::Bike | TravelMode::Rideshare)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TravelMode::Car => "Car",
            TravelMode::Transit => "Transit",
            TravelMode::Walk => "Walk",
            TravelMode::Bike => "Bike",
            TravelMode::Rideshare => "Rideshare",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result slot for one travel mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOption {
    pub mode: TravelMode,
    pub route: Option<Arc<Route>>,
    pub is_calculating: bool,
    pub error: Option<RouteError>,
}

impl RouteOption {
    fn empty(mode: TravelMode) -> Self {
        Self {
            mode,
            route: None,
            is_calculating: false,
            error: None,
        }
    }
}

/// Per-mode route comparator.
pub struct RouteOptions {
    provider: Arc<dyn DirectionsProvider>,
    state: watch::Sender<Vec<RouteOption>>,
    generation: AtomicU64,
}

impl RouteOptions {
    pub fn new(provider: Arc<dyn DirectionsProvider>) -> Self {
        let (state, _) = watch::channel(Self::empty_options());
        Self {
            provider,
            state,
            generation: AtomicU64::new(0),
        }
    }

    fn empty_options() -> Vec<RouteOption> {
        TravelMode::ALL.iter().copied().map(RouteOption::empty).collect()
    }

    pub fn options(&self) -> Vec<RouteOption> {
        self.state.borrow().clone()
    }

    pub fn option(&self, mode: TravelMode) -> Option<RouteOption> {
        self.state.borrow().iter().find(|o| o.mode == mode).cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<RouteOption>> {
        self.state.subscribe()
    }

    /// Calculate one route per supported mode from `source` to `destination`.
    ///
    /// A later `calculate` or `clear` discards results still in flight.
    pub async fn calculate(&self, source: Coordinate, destination: Coordinate) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "Calculating route options");

        self.state.send_modify(|options| {
            for option in options.iter_mut() {
                option.route = None;
                if option.mode.is_supported() {
                    option.is_calculating = true;
                    option.error = None;
                } else {
                    option.is_calculating = false;
                    option.error = Some(RouteError::UnsupportedMode {
                        mode: option.mode.label().to_string(),
                    });
                }
            }
        });

        let provider = self.provider.as_ref();
        let mut pending: FuturesUnordered<_> = TravelMode::ALL
            .iter()
            .copied()
            .filter(TravelMode::is_supported)
            .map(|mode| async move {
                let request = RouteRequest::new(source, destination)
                    .with_mode(mode.transport_mode())
                    .with_alternates(false);
                (mode, provider.calculate_routes(&request).await)
            })
            .collect();

        while let Some((mode, result)) = pending.next().await {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "Discarding stale route options");
                return;
            }

            let outcome = match result {
                Ok(routes) => match routes.into_iter().next() {
                    Some(route) => Ok(Arc::new(route)),
                    None => Err(RouteError::NoRoutesFound),
                },
                Err(e) => Err(RouteError::from(e)),
            };

            self.state.send_modify(|options| {
                if let Some(option) = options.iter_mut().find(|o| o.mode == mode) {
                    option.is_calculating = false;
                    match outcome {
                        Ok(route) => option.route = Some(route),
                        Err(error) => option.error = Some(error),
                    }
                }
            });
        }
    }

    /// Drop all results and cancel interest in in-flight calculations.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(Self::empty_options());
    }
}

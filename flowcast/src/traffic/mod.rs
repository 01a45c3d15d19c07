//! Synthetic traffic
//!
//! Generates congestion segments around the user (or a searched location) by
//! sampling routes on a small ring, and a five-day congestion forecast. The
//! data is for visualization only.

mod forecast;
mod generator;
mod sampler;
mod simulator;
mod types;

pub use forecast::{build_forecast, day_name, DEFAULT_FORECAST_DAYS};
pub use generator::{
    CycleRoutes, GeneratorConfig, SegmentGenerator, DEFAULT_BEARING_COUNT,
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_RADIUS_DEG,
};
pub use sampler::{CongestionSampler, CongestionWeights, DEFAULT_VEHICLE_RANGE};
pub use simulator::{
    TrafficConfig, TrafficSimulator, TrafficState, TrafficWorker, DEFAULT_INTER_REQUEST_DELAY,
    DEFAULT_MIN_GENERATION_INTERVAL, DEFAULT_REFRESH_INTERVAL,
};
pub use types::{CongestionLevel, DayPeriod, TrafficPrediction, TrafficSegment, VehicleMarker};

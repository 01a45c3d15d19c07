//! Five-day congestion forecast.

use chrono::{Days, NaiveDate};
use rand::Rng;

use super::{CongestionSampler, TrafficPrediction};

/// Default number of forecast days.
pub const DEFAULT_FORECAST_DAYS: usize = 5;

/// Display name for the day `offset` days after today.
pub fn day_name(today: NaiveDate, offset: u64) -> String {
    match offset {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => today
            .checked_add_days(Days::new(offset))
            .map(|d| d.format("%A").to_string())
            .unwrap_or_default(),
    }
}

/// Build `days` predictions starting at `today`, sampling each period
/// independently.
pub fn build_forecast<R: Rng>(
    today: NaiveDate,
    days: usize,
    sampler: &CongestionSampler,
    rng: &mut R,
) -> Vec<TrafficPrediction> {
    (0..days as u64)
        .filter_map(|offset| {
            let date = today.checked_add_days(Days::new(offset))?;
            Some(TrafficPrediction {
                day_name: day_name(today, offset),
                date,
                morning: sampler.sample_level(rng),
                afternoon: sampler.sample_level(rng),
                evening: sampler.sample_level(rng),
            })
        })
        .collect()
}

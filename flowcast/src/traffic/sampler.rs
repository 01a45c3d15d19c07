//! Random congestion sampling.

use std::ops::RangeInclusive;

use rand::Rng;

use super::CongestionLevel;

/// Probability of each congestion level. Should sum to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct CongestionWeights {
    pub low: f64,
    pub moderate: f64,
    pub heavy: f64,
}

impl Default for CongestionWeights {
    fn default() -> Self {
        Self {
            low: 0.3,
            moderate: 0.4,
            heavy: 0.3,
        }
    }
}

/// Default range of vehicles drawn per segment.
pub const DEFAULT_VEHICLE_RANGE: RangeInclusive<u32> = 1..=3;

/// Draws congestion levels and vehicle counts.
#[derive(Debug, Clone)]
pub struct CongestionSampler {
    weights: CongestionWeights,
    vehicles: RangeInclusive<u32>,
}

impl Default for CongestionSampler {
    fn default() -> Self {
        Self::new(CongestionWeights::default(), DEFAULT_VEHICLE_RANGE)
    }
}

impl CongestionSampler {
    pub fn new(weights: CongestionWeights, vehicles: RangeInclusive<u32>) -> Self {
        Self { weights, vehicles }
    }

    /// Map a uniform draw in `[0, 1)` to a level.
    pub fn level_for(&self, draw: f64) -> CongestionLevel {
        let total = self.weights.low + self.weights.moderate + self.weights.heavy;
        let draw = if total > 0.0 { draw * total } else { draw };
        if draw < self.weights.low {
            CongestionLevel::Low
        } else if draw < self.weights.low + self.weights.moderate {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Heavy
        }
    }

    pub fn sample_level<R: Rng>(&self, rng: &mut R) -> CongestionLevel {
        self.level_for(rng.random::<f64>())
    }

    pub fn sample_vehicles<R: Rng>(&self, rng: &mut R) -> u32 {
        if self.vehicles.is_empty() {
            return *self.vehicles.start();
        }
        rng.random_range(self.vehicles.clone())
    }
}

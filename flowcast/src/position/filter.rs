//! Sample filtering for position and heading updates.
//!
//! The sensor reports far more often than the navigation core needs. Only
//! samples that are valid and differ meaningfully from the last accepted one
//! are forwarded to subscribers. Only the previous accepted sample is kept.

use super::{Heading, Position};
use crate::coord::angular_difference;

/// Default minimum movement before a new position is accepted (meters).
pub const DEFAULT_MIN_DISTANCE_M: f64 = 5.0;

/// Default minimum heading change before a new heading is accepted (degrees).
pub const DEFAULT_MIN_HEADING_DELTA_DEG: f64 = 5.0;

/// Thresholds for [`SampleFilter`].
#[derive(Debug, Clone)]
pub struct SampleFilterConfig {
    /// A position must move strictly more than this from the last accepted one.
    pub min_distance_m: f64,
    /// A heading must change strictly more than this from the last accepted one.
    pub min_heading_delta_deg: f64,
}

impl Default for SampleFilterConfig {
    fn default() -> Self {
        Self {
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            min_heading_delta_deg: DEFAULT_MIN_HEADING_DELTA_DEG,
        }
    }
}

/// Stateful delta filter over raw sensor samples.
#[derive(Debug, Default)]
pub struct SampleFilter {
    config: SampleFilterConfig,
    last_position: Option<Position>,
    last_heading: Option<Heading>,
}

impl SampleFilter {
    pub fn new(config: SampleFilterConfig) -> Self {
        Self {
            config,
            last_position: None,
            last_heading: None,
        }
    }

    /// Returns true and remembers `position` if it should be published.
    pub fn accept_position(&mut self, position: &Position) -> bool {
        if !position.is_valid() {
            return false;
        }
        if let Some(last) = &self.last_position {
            if last.distance_to(position) <= self.config.min_distance_m {
                return false;
            }
        }
        self.last_position = Some(position.clone());
        true
    }

    /// Returns true and remembers `heading` if it should be published.
    pub fn accept_heading(&mut self, heading: &Heading) -> bool {
        if !heading.is_valid() {
            return false;
        }
        if let Some(last) = &self.last_heading {
            let delta = angular_difference(last.true_heading, heading.true_heading);
            if delta <= self.config.min_heading_delta_deg {
                return false;
            }
        }
        self.last_heading = Some(heading.clone());
        true
    }

    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn last_heading(&self) -> Option<&Heading> {
        self.last_heading.as_ref()
    }

    /// Forget both remembered samples.
    pub fn reset(&mut self) {
        self.last_position = None;
        self.last_heading = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_valid_position_accepted() {
        let mut filter = SampleFilter::default();
        assert!(filter.accept_position(&Position::new(37.0, -122.0, 5.0)));
    }

    #[test]
    fn test_invalid_accuracy_rejected() {
        let mut filter = SampleFilter::default();
        assert!(!filter.accept_position(&Position::new(37.0, -122.0, -1.0)));
        assert!(filter.last_position().is_none());
    }

    #[test]
    fn test_small_move_rejected() {
        let mut filter = SampleFilter::default();
        assert!(filter.accept_position(&Position::new(37.0, -122.0, 5.0)));
        // ~1.1 m north
        assert!(!filter.accept_position(&Position::new(37.00001, -122.0, 5.0)));
        // ~11 m north
        assert!(filter.accept_position(&Position::new(37.0001, -122.0, 5.0)));
    }

    #[test]
    fn test_rejected_sample_does_not_move_reference() {
        let mut filter = SampleFilter::default();
        filter.accept_position(&Position::new(37.0, -122.0, 5.0));
        // Three ~3.3 m steps: each is small relative to the last accepted fix
        // until the cumulative offset exceeds 5 m.
        assert!(!filter.accept_position(&Position::new(37.00003, -122.0, 5.0)));
        assert!(filter.accept_position(&Position::new(37.00006, -122.0, 5.0)));
    }

    #[test]
    fn test_heading_delta_threshold() {
        let mut filter = SampleFilter::default();
        assert!(filter.accept_heading(&Heading::new(90.0, 5.0)));
        assert!(!filter.accept_heading(&Heading::new(94.0, 5.0)));
        assert!(!filter.accept_heading(&Heading::new(95.0, 5.0)));
        assert!(filter.accept_heading(&Heading::new(96.0, 5.0)));
    }

    #[test]
    fn test_heading_delta_wraps_around_north() {
        let mut filter = SampleFilter::default();
        assert!(filter.accept_heading(&Heading::new(358.0, 5.0)));
        assert!(!filter.accept_heading(&Heading::new(2.0, 5.0)));
        assert!(filter.accept_heading(&Heading::new(10.0, 5.0)));
    }

    #[test]
    fn test_invalid_heading_rejected() {
        let mut filter = SampleFilter::default();
        assert!(!filter.accept_heading(&Heading::new(90.0, -1.0)));
    }
}

//! Traffic data model.

use std::fmt;

use chrono::NaiveDate;

use crate::coord::Coordinate;

/// Congestion bucket for a road segment or time period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CongestionLevel {
    Low,
    Moderate,
    Heavy,
}

impl CongestionLevel {
    pub const ALL: [CongestionLevel; 3] = [
        CongestionLevel::Low,
        CongestionLevel::Moderate,
        CongestionLevel::Heavy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CongestionLevel::Low => "Low",
            CongestionLevel::Moderate => "Moderate",
            CongestionLevel::Heavy => "Heavy",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A synthetic congested stretch of road.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSegment {
    pub coordinates: Vec<Coordinate>,
    pub congestion_level: CongestionLevel,
    pub vehicle_count: u32,
}

/// A vehicle icon placed along a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleMarker {
    pub coordinate: Coordinate,
    /// Direction of travel in degrees.
    pub heading: f64,
    pub congestion_level: CongestionLevel,
}

impl TrafficSegment {
    /// Spread `vehicle_count` markers evenly between the segment's endpoints,
    /// facing from its first point towards its last.
    pub fn vehicle_markers(&self) -> Vec<VehicleMarker> {
        let (Some(first), Some(last)) = (self.coordinates.first(), self.coordinates.last()) else {
            return Vec::new();
        };
        let heading = first.bearing_to(last);
        let n = self.vehicle_count as f64;

        (1..=self.vehicle_count)
            .map(|i| {
                let t = i as f64 / (n + 1.0);
                VehicleMarker {
                    coordinate: Coordinate::new(
                        first.latitude + (last.latitude - first.latitude) * t,
                        first.longitude + (last.longitude - first.longitude) * t,
                    ),
                    heading,
                    congestion_level: self.congestion_level,
                }
            })
            .collect()
    }
}

/// Part of the day covered by a forecast entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    pub const ALL: [DayPeriod; 3] = [DayPeriod::Morning, DayPeriod::Afternoon, DayPeriod::Evening];

    pub fn label(&self) -> &'static str {
        match self {
            DayPeriod::Morning => "Morning",
            DayPeriod::Afternoon => "Afternoon",
            DayPeriod::Evening => "Evening",
        }
    }
}

/// Forecast congestion for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficPrediction {
    /// "Today", "Tomorrow", then the weekday name.
    pub day_name: String,
    pub date: NaiveDate,
    pub morning: CongestionLevel,
    pub afternoon: CongestionLevel,
    pub evening: CongestionLevel,
}

impl TrafficPrediction {
    pub fn level(&self, period: DayPeriod) -> CongestionLevel {
        match period {
            DayPeriod::Morning => self.morning,
            DayPeriod::Afternoon => self.afternoon,
            DayPeriod::Evening => self.evening,
        }
    }
}

//! Formatting and waiting helpers shared across commands.

use std::time::Duration;

use flowcast::provider::Route;
use flowcast::traffic::CongestionLevel;

/// Human-readable distance: metres below 1 km, kilometres above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Human-readable travel time rounded to minutes.
pub fn format_duration(duration: Duration) -> String {
    let minutes = (duration.as_secs() + 30) / 60;
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    }
}

/// One-line route summary.
pub fn route_summary(route: &Route) -> String {
    format!(
        "{}, {} ({} steps)",
        format_distance(route.total_distance_m),
        format_duration(route.total_duration),
        route.steps.len()
    )
}

/// Short marker for congestion tables.
pub fn congestion_marker(level: CongestionLevel) -> &'static str {
    match level {
        CongestionLevel::Low => "·",
        CongestionLevel::Moderate => "▲",
        CongestionLevel::Heavy => "■",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(850.4), "850 m");
        assert_eq!(format_distance(1000.0), "1.0 km");
        assert_eq!(format_distance(12_345.0), "12.3 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 min");
        assert_eq!(format_duration(Duration::from_secs(89)), "1 min");
        assert_eq!(format_duration(Duration::from_secs(90)), "2 min");
        assert_eq!(format_duration(Duration::from_secs(3600 + 5 * 60)), "1 h 05 min");
    }

    #[test]
    fn test_route_summary() {
        let route = Route::new(Vec::new(), Duration::from_secs(600), 2500.0);
        assert_eq!(route_summary(&route), "2.5 km, 10 min (0 steps)");
    }
}

//! Geographic helpers
//!
//! Great-circle distance, initial bearing and the planar bearing offset used to
//! place synthetic traffic destinations around a focal point.
//!
//! Distances are meters, angles are degrees. Bearings are normalized to
//! `[0, 360)` measured clockwise from true north.

mod types;

pub use types::{
    CoordError, Coordinate, MapRegion, DEFAULT_REGION_SPAN_DEG, MAX_LAT, MAX_LON, MIN_LAT,
    MIN_LON, NAVIGATION_REGION_SPAN_DEG,
};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Conversion factor from meters per second to miles per hour.
pub const MPS_TO_MPH: f64 = 2.23694;

/// Haversine distance between two coordinates in meters.
#[inline]
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `from` to `to`, in degrees.
#[inline]
pub fn initial_bearing(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_bearing(y.atan2(x).to_degrees())
}

/// Normalize any angle in degrees to `[0, 360)`.
#[inline]
pub fn normalize_bearing(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Smallest absolute difference between two headings, in degrees (0-180).
#[inline]
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Offset `origin` by `radius_deg` degrees along `bearing_deg`.
///
/// This is a flat-plane approximation: latitude moves by `radius * cos(bearing)`
/// and longitude by `radius * sin(bearing)`. Good enough for the ~1 km rings
/// used by the traffic generator.
#[inline]
pub fn planar_offset(origin: &Coordinate, bearing_deg: f64, radius_deg: f64) -> Coordinate {
    let bearing = bearing_deg.to_radians();
    Coordinate::new(
        origin.latitude + radius_deg * bearing.cos(),
        origin.longitude + radius_deg * bearing.sin(),
    )
}

/// Evenly spaced bearings around the compass, starting at north.
pub fn ring_bearings(count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let step = 360.0 / count as f64;
    (0..count).map(|i| i as f64 * step).collect()
}

/// Convert a speed in meters per second to miles per hour.
///
/// Negative speeds (sensor reports "unknown") yield `None`.
#[inline]
pub fn mps_to_mph(speed_mps: f64) -> Option<f64> {
    if speed_mps < 0.0 || !speed_mps.is_finite() {
        None
    } else {
        Some(speed_mps * MPS_TO_MPH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SF: Coordinate = Coordinate::new(37.7749, -122.4194);
    const LA: Coordinate = Coordinate::new(34.0522, -118.2437);

    #[test]
    fn test_haversine_known_distance() {
        let d = haversine_distance(&SF, &LA);
        // ~559 km between the two city centers
        assert!((d - 559_000.0).abs() < 2_000.0, "distance was {}", d);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        assert_eq!(haversine_distance(&SF, &SF), 0.0);
    }

    #[test]
    fn test_initial_bearing_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);
        assert!((initial_bearing(&origin, &Coordinate::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((initial_bearing(&origin, &Coordinate::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((initial_bearing(&origin, &Coordinate::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((initial_bearing(&origin, &Coordinate::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_angular_difference_wraps() {
        assert_eq!(angular_difference(359.0, 1.0), 2.0);
        assert_eq!(angular_difference(10.0, 350.0), 20.0);
        assert_eq!(angular_difference(90.0, 270.0), 180.0);
    }

    #[test]
    fn test_planar_offset_north_and_east() {
        let origin = Coordinate::new(37.0, -122.0);
        let north = planar_offset(&origin, 0.0, 0.01);
        assert!((north.latitude - 37.01).abs() < 1e-12);
        assert!((north.longitude - -122.0).abs() < 1e-12);

        let east = planar_offset(&origin, 90.0, 0.01);
        assert!((east.latitude - 37.0).abs() < 1e-12);
        assert!((east.longitude - -121.99).abs() < 1e-12);
    }

    #[test]
    fn test_ring_bearings_six() {
        assert_eq!(
            ring_bearings(6),
            vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0]
        );
        assert!(ring_bearings(0).is_empty());
    }

    #[test]
    fn test_mps_to_mph() {
        let mph = mps_to_mph(10.0).unwrap();
        assert!((mph - 22.3694).abs() < 1e-9);
        assert_eq!(mps_to_mph(-1.0), None);
    }

    #[test]
    fn test_parse_coordinate() {
        let c: Coordinate = "37.7749, -122.4194".parse().unwrap();
        assert_eq!(c, SF);
        assert!(matches!(
            "91,0".parse::<Coordinate>(),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            "abc".parse::<Coordinate>(),
            Err(CoordError::Malformed(_))
        ));
    }

    #[test]
    fn test_region_contains() {
        let region = MapRegion::around(SF);
        assert!(region.contains(&Coordinate::new(37.78, -122.42)));
        assert!(!region.contains(&LA));
        assert_eq!(MapRegion::navigation(SF).span_deg, NAVIGATION_REGION_SPAN_DEG);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_distance_is_symmetric(
                lat1 in -89.0..89.0_f64, lon1 in -179.0..179.0_f64,
                lat2 in -89.0..89.0_f64, lon2 in -179.0..179.0_f64,
            ) {
                let a = Coordinate::new(lat1, lon1);
                let b = Coordinate::new(lat2, lon2);
                let ab = haversine_distance(&a, &b);
                let ba = haversine_distance(&b, &a);
                prop_assert!((ab - ba).abs() < 1e-6);
                prop_assert!(ab >= 0.0);
            }

            #[test]
            fn test_bearing_in_range(
                lat1 in -89.0..89.0_f64, lon1 in -179.0..179.0_f64,
                lat2 in -89.0..89.0_f64, lon2 in -179.0..179.0_f64,
            ) {
                let b = initial_bearing(&Coordinate::new(lat1, lon1), &Coordinate::new(lat2, lon2));
                prop_assert!((0.0..360.0).contains(&b), "bearing {} out of range", b);
            }

            #[test]
            fn test_planar_offset_keeps_radius(
                bearing in 0.0..360.0_f64,
                radius in 0.001..0.1_f64,
            ) {
                let origin = Coordinate::new(10.0, 20.0);
                let p = planar_offset(&origin, bearing, radius);
                let dlat = p.latitude - origin.latitude;
                let dlon = p.longitude - origin.longitude;
                prop_assert!(((dlat * dlat + dlon * dlon).sqrt() - radius).abs() < 1e-9);
            }
        }
    }
}

//! Great-circle helpers.
//!
//! - Latitude/longitude: degrees
//! - Bearing: degrees true (0-360, 0=north, 90=east)
//! - Distance: meters

use crate::RoutePoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
#[must_use]
pub fn distance_m(from: RoutePoint, to: RoutePoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial bearing (forward azimuth) from `from` to `to`, normalized to
/// `[0, 360)`.
#[must_use]
pub fn bearing_deg(from: RoutePoint, to: RoutePoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Linear interpolation between two points. `fraction` is clamped to `[0, 1]`.
#[must_use]
pub fn interpolate(from: RoutePoint, to: RoutePoint, fraction: f64) -> RoutePoint {
    let t = fraction.clamp(0.0, 1.0);
    RoutePoint {
        latitude: (to.latitude - from.latitude).mul_add(t, from.latitude),
        longitude: (to.longitude - from.longitude).mul_add(t, from.longitude),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEOUL: RoutePoint = RoutePoint::new(37.5665, 126.9780);

    #[test]
    fn zero_distance() {
        assert!(distance_m(SEOUL, SEOUL).abs() < f64::EPSILON);
    }

    #[test]
    fn one_degree_of_latitude() {
        let north = RoutePoint::new(38.5665, 126.9780);
        let d = distance_m(SEOUL, north);
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }

    #[test]
    fn small_diagonal_step() {
        let next = RoutePoint::new(37.5666, 126.9781);
        let d = distance_m(SEOUL, next);
        assert!((14.0..16.0).contains(&d), "got {d}");
    }

    #[test]
    fn cardinal_bearings() {
        let east = RoutePoint::new(0.0, 1.0);
        let south = RoutePoint::new(-1.0, 0.0);
        let west = RoutePoint::new(0.0, -1.0);
        let origin = RoutePoint::default();

        assert!((bearing_deg(origin, east) - 90.0).abs() < 1e-6);
        assert!((bearing_deg(origin, south) - 180.0).abs() < 1e-6);
        assert!((bearing_deg(origin, west) - 270.0).abs() < 1e-6);
        assert!(bearing_deg(origin, RoutePoint::new(1.0, 0.0)).abs() < 1e-6);
    }

    #[test]
    fn northeast_step_in_seoul() {
        // longitude degrees are shorter than latitude degrees at 37.5N
        let bearing = bearing_deg(SEOUL, RoutePoint::new(37.5666, 126.9781));
        assert!((35.0..45.0).contains(&bearing), "got {bearing}");
    }

    #[test]
    fn interpolate_midpoint() {
        let to = RoutePoint::new(37.5675, 126.9790);
        let mid = interpolate(SEOUL, to, 0.5);
        assert!((mid.latitude - 37.5670).abs() < 1e-9);
        assert!((mid.longitude - 126.9785).abs() < 1e-9);
        assert_eq!(interpolate(SEOUL, to, 2.0), to);
    }
}

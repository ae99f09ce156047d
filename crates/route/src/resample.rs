use crate::RoutePoint;
use crate::geo::{distance_m, interpolate};

/// Total polyline length in meters.
#[must_use]
pub fn route_length_m(points: &[RoutePoint]) -> f64 {
    points.windows(2).map(|pair| distance_m(pair[0], pair[1])).sum()
}

/// Upper bound on a densified route: a day of one-second ticks.
pub const MAX_ROUTE_POINTS: usize = 86_400;

/// Number of points needed to drive `points` at `cruise_kmh` with one point
/// per `interval_secs`. Never less than the input length, never more than
/// [`MAX_ROUTE_POINTS`] unless the input itself is longer.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn target_count(points: &[RoutePoint], cruise_kmh: f64, interval_secs: f64) -> usize {
    let step_m = cruise_kmh / 3.6 * interval_secs;
    if step_m <= 0.0 {
        return points.len();
    }
    let needed = (route_length_m(points) / step_m).ceil() as usize + 1;
    needed.min(MAX_ROUTE_POINTS).max(points.len())
}

/// Densify `points` to exactly `target` points by inserting linearly
/// interpolated points into each segment.
///
/// Extra points are spread evenly by segment count; the first
/// `extra % segments` segments take one more. Routes already at or above the
/// target, or with fewer than two points, are returned unchanged.
#[must_use]
pub fn resample(points: &[RoutePoint], target: usize) -> Vec<RoutePoint> {
    if points.len() < 2 || points.len() >= target {
        return points.to_vec();
    }

    let segments = points.len() - 1;
    let extra = target - points.len();
    let per_segment = extra / segments;
    let remainder = extra % segments;

    let mut out = Vec::with_capacity(target);
    for (i, pair) in points.windows(2).enumerate() {
        let inserts = per_segment + usize::from(i < remainder);
        out.push(pair[0]);
        for k in 1..=inserts {
            #[allow(clippy::cast_precision_loss)]
            let fraction = k as f64 / (inserts + 1) as f64;
            out.push(interpolate(pair[0], pair[1], fraction));
        }
    }
    out.extend(points.last().copied());

    out
}

//! Route geometry and trip waypoints.
//!
//! A trip is an ordered list of [`RoutePoint`]s, fetched from a directions
//! provider (or generated locally when configured to), densified to the
//! sampler's cadence and consumed one point per tick through a
//! [`RouteCursor`].

mod config;
mod cursor;
mod directions;
mod fallback;
pub mod geo;
mod resample;

use serde::{Deserialize, Serialize};

pub use crate::config::RouteConfig;
pub use crate::cursor::RouteCursor;
pub use crate::directions::RouteSource;
pub use crate::fallback::{MAX_STEP_M, RandomWalk};
pub use crate::resample::{MAX_ROUTE_POINTS, resample, route_length_m, target_count};

/// A single waypoint in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl RoutePoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

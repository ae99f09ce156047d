//! # Directions
//!
//! Fetches the road polyline between two points from the directions
//! provider and turns it into trip waypoints.

use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::{Method, Request};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use telemetry::{HttpRequest, Result, route_unavailable};
use tracing::{info, warn};

use crate::fallback::RandomWalk;
use crate::resample::{resample, target_count};
use crate::{RouteConfig, RoutePoint};

/// Supplies the waypoint sequence for one trip.
#[derive(Clone)]
pub struct RouteSource {
    http: Arc<dyn HttpRequest>,
    config: RouteConfig,
}

impl RouteSource {
    #[must_use]
    pub fn new(http: Arc<dyn HttpRequest>, config: RouteConfig) -> Self {
        Self { http, config }
    }

    /// Full polyline from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::RouteUnavailable`] on any failure:
    /// missing credentials, transport errors, non-success responses, provider
    /// result codes, or a polyline with fewer than two vertices.
    pub async fn fetch_route(
        &self, origin: RoutePoint, destination: RoutePoint,
    ) -> Result<Vec<RoutePoint>> {
        if self.config.api_key.is_empty() {
            return Err(route_unavailable!("directions api key is not configured"));
        }

        let uri = format!(
            "{}?origin={},{}&destination={},{}",
            self.config.directions_url,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        );
        let request = Request::builder()
            .method(Method::GET)
            .uri(&uri)
            .header(AUTHORIZATION, format!("KakaoAK {}", self.config.api_key))
            .body(Vec::new())
            .map_err(|e| route_unavailable!("building directions request: {e}"))?;

        let response = self
            .http
            .fetch(request)
            .await
            .map_err(|e| route_unavailable!("directions request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(route_unavailable!("directions provider returned {}", response.status()));
        }

        let directions: Directions = serde_json::from_slice(response.body())
            .map_err(|e| route_unavailable!("invalid directions payload: {e}"))?;
        let points = directions.into_points()?;

        info!(points = points.len(), "fetched route from directions provider");
        Ok(points)
    }

    /// Waypoints for a trip, densified so that one point per
    /// `interval_secs` tick approximates the configured cruise speed.
    ///
    /// Falls back to a local random walk from `origin` only when
    /// `fallback_enabled` is set.
    ///
    /// # Errors
    ///
    /// Returns [`telemetry::Error::RouteUnavailable`] when directions fail
    /// and fallback is disabled.
    pub async fn plan(
        &self, origin: RoutePoint, destination: RoutePoint, interval_secs: f64,
    ) -> Result<Vec<RoutePoint>> {
        let points = match self.fetch_route(origin, destination).await {
            Ok(points) => points,
            Err(e) if self.config.fallback_enabled => {
                warn!(error = %e, points = self.config.fallback_points, "using random-walk route");
                let mut rng = StdRng::from_entropy();
                return Ok(RandomWalk::default().generate(
                    origin,
                    self.config.fallback_points,
                    &mut rng,
                ));
            }
            Err(e) => return Err(e),
        };

        let target = target_count(&points, self.config.cruise_speed_kmh, interval_secs);
        Ok(resample(&points, target))
    }
}

#[derive(Debug, Deserialize)]
struct Directions {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    result_code: i64,
    #[serde(default)]
    result_msg: String,
    #[serde(default)]
    sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    #[serde(default)]
    roads: Vec<Road>,
}

#[derive(Debug, Deserialize)]
struct Road {
    /// Flat `[x0, y0, x1, y1, ...]` list, x = longitude.
    #[serde(default)]
    vertexes: Vec<f64>,
}

impl Directions {
    fn into_points(self) -> Result<Vec<RoutePoint>> {
        let Some(route) = self.routes.into_iter().next() else {
            return Err(route_unavailable!("no routes in directions response"));
        };
        if route.result_code != 0 {
            return Err(route_unavailable!(
                "directions result {}: {}",
                route.result_code,
                route.result_msg
            ));
        }

        let points: Vec<RoutePoint> = route
            .sections
            .iter()
            .flat_map(|section| &section.roads)
            .flat_map(|road| road.vertexes.chunks_exact(2))
            .map(|xy| RoutePoint::new(xy[1], xy[0]))
            .collect();

        if points.len() < 2 {
            return Err(route_unavailable!("route has {} vertices", points.len()));
        }
        Ok(points)
    }
}

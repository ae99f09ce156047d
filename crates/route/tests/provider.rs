#![allow(missing_docs)]

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use pretty_assertions::assert_eq;
use route::{RouteConfig, RoutePoint, RouteSource, geo};
use telemetry::{Error, HttpRequest};

const ORIGIN: RoutePoint = RoutePoint::new(37.5665, 126.9780);
const DESTINATION: RoutePoint = RoutePoint::new(37.5675, 126.9790);

#[derive(Clone)]
struct MockProvider {
    status: StatusCode,
    body: &'static str,
}

impl MockProvider {
    fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: r#"{
                "routes": [{
                    "result_code": 0,
                    "result_msg": "ok",
                    "sections": [{"roads": [
                        {"vertexes": [126.9780, 37.5665, 126.9780, 37.5675]},
                        {"vertexes": [126.9790, 37.5675]}
                    ]}]
                }]
            }"#,
        }
    }
}

#[async_trait]
impl HttpRequest for MockProvider {
    async fn fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>> {
        if request.uri().path() != "/v1/directions" {
            return Err(anyhow!("unknown path: {}", request.uri().path()));
        }
        let auth = request.headers().get("authorization").context("missing authorization")?;
        if auth != "KakaoAK test-key" {
            return Err(anyhow!("unexpected authorization: {auth:?}"));
        }
        if request.uri().query() != Some("origin=126.978,37.5665&destination=126.979,37.5675") {
            return Err(anyhow!("unexpected query: {:?}", request.uri().query()));
        }

        Response::builder()
            .status(self.status)
            .body(Bytes::from_static(self.body.as_bytes()))
            .context("failed to build response")
    }
}

struct Unreachable;

#[async_trait]
impl HttpRequest for Unreachable {
    async fn fetch(&self, _: Request<Vec<u8>>) -> Result<Response<Bytes>> {
        Err(Error::Connection("connection refused".to_string()).into())
    }
}

fn config(fallback_enabled: bool) -> RouteConfig {
    RouteConfig {
        directions_url: "http://localhost:9090/v1/directions".to_string(),
        api_key: "test-key".to_string(),
        fallback_enabled,
        fallback_points: 30,
        cruise_speed_kmh: 36.0,
    }
}

#[tokio::test]
async fn fetches_route_vertices() {
    let source = RouteSource::new(Arc::new(MockProvider::ok()), config(false));
    let points = source.fetch_route(ORIGIN, DESTINATION).await.expect("should fetch route");

    assert_eq!(
        points,
        vec![
            RoutePoint::new(37.5665, 126.9780),
            RoutePoint::new(37.5675, 126.9780),
            RoutePoint::new(37.5675, 126.9790),
        ]
    );
}

#[tokio::test]
async fn plan_densifies_to_cruise_speed() {
    let source = RouteSource::new(Arc::new(MockProvider::ok()), config(false));
    let points = source.plan(ORIGIN, DESTINATION, 1.0).await.expect("should plan route");

    // ~200 m at 10 m per tick
    assert_eq!(points.len(), 21);
    for pair in points.windows(2) {
        assert!(geo::distance_m(pair[0], pair[1]) < 15.0);
    }
}

#[tokio::test]
async fn rejected_request_is_unavailable() {
    let provider = MockProvider { status: StatusCode::UNAUTHORIZED, body: "{}" };
    let source = RouteSource::new(Arc::new(provider), config(false));
    let err = source.fetch_route(ORIGIN, DESTINATION).await.unwrap_err();

    assert_eq!(
        err,
        Error::RouteUnavailable("directions provider returned 401 Unauthorized".to_string())
    );
}

#[tokio::test]
async fn missing_key_is_unavailable() {
    let mut cfg = config(false);
    cfg.api_key = String::new();
    let source = RouteSource::new(Arc::new(MockProvider::ok()), cfg);

    assert!(matches!(
        source.fetch_route(ORIGIN, DESTINATION).await,
        Err(Error::RouteUnavailable(_))
    ));
}

#[tokio::test]
async fn no_silent_fallback() {
    let source = RouteSource::new(Arc::new(Unreachable), config(false));
    let err = source.plan(ORIGIN, DESTINATION, 1.0).await.unwrap_err();

    assert!(matches!(err, Error::RouteUnavailable(_)));
}

#[tokio::test]
async fn configured_fallback_walks_from_origin() {
    let source = RouteSource::new(Arc::new(Unreachable), config(true));
    let points = source.plan(ORIGIN, DESTINATION, 1.0).await.expect("should fall back");

    assert_eq!(points.len(), 30);
    assert_eq!(points[0], ORIGIN);
}

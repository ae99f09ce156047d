//! HTTP front end.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use delivery::Stored;
use emulator::DeviceProfile;
use route::RoutePoint;
use serde::Deserialize;
use serde_json::{Value, json};
use telemetry::{Error, HttpError, bad_request};
use tracing::info;

use crate::AppState;

pub type HttpResult<T> = Result<T, HttpError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/emulator/{mdn}/start", post(start))
        .route("/api/emulator/{mdn}/stop", post(stop))
        .route("/api/emulator/{mdn}/data", get(data))
        .route("/api/emulator/{mdn}/geofence", post(geofence))
        .route("/api/emulator/{mdn}/gps/synthetic", post(synthetic))
        .route("/api/emulator/{mdn}/pending", get(pending))
        .route("/api/logs/pending", get(pending_summary))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    destination: Option<RoutePoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeofenceRequest {
    geo_grp_id: String,
    geo_p_id: String,
    evt_val: String,
}

const fn disposition(stored: Stored) -> &'static str {
    match stored {
        Stored::Delivered => "sent",
        Stored::Queued => "queued",
    }
}

#[axum::debug_handler]
async fn start(
    State(state): State<AppState>, Path(mdn): Path<String>, body: Bytes,
) -> HttpResult<Json<Value>> {
    let request: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| bad_request!("invalid start request: {e}"))?
    };

    state.emulator.start(DeviceProfile::for_mdn(&mdn), request.destination).await?;
    info!(mdn = %mdn, "emulator started");
    Ok(Json(json!({"status": "started", "mdn": mdn})))
}

#[axum::debug_handler]
async fn stop(State(state): State<AppState>, Path(mdn): Path<String>) -> HttpResult<Json<Value>> {
    match state.emulator.stop(&mdn).await {
        Ok(()) => Ok(Json(json!({"status": "stopped", "mdn": mdn}))),
        // unknown and inactive devices are both "not found" to callers
        Err(Error::InvalidState(reason)) => Err(Error::NotFound(reason).into()),
        Err(e) => Err(e.into()),
    }
}

#[axum::debug_handler]
async fn data(State(state): State<AppState>, Path(mdn): Path<String>) -> HttpResult<Json<Value>> {
    let status = state.emulator.status(&mdn).await?;
    Ok(Json(serde_json::to_value(status).map_err(Error::from)?))
}

#[axum::debug_handler]
async fn geofence(
    State(state): State<AppState>, Path(mdn): Path<String>, Json(request): Json<GeofenceRequest>,
) -> HttpResult<Json<Value>> {
    let stored = state
        .emulator
        .geofence(&mdn, &request.geo_grp_id, &request.geo_p_id, &request.evt_val)
        .await?;
    Ok(Json(json!({"status": disposition(stored), "mdn": mdn})))
}

#[axum::debug_handler]
async fn synthetic(State(state): State<AppState>, Path(mdn): Path<String>) -> HttpResult<Json<Value>> {
    let stored = state.emulator.synthetic_batch(&mdn).await?;
    Ok(Json(json!({"status": disposition(stored), "mdn": mdn})))
}

#[axum::debug_handler]
async fn pending(State(state): State<AppState>, Path(mdn): Path<String>) -> HttpResult<Json<Value>> {
    let entries = state.emulator.store().pending(&mdn);
    Ok(Json(json!({
        "mdn": mdn,
        "count": entries.len(),
        "entries": serde_json::to_value(entries).map_err(Error::from)?,
    })))
}

#[axum::debug_handler]
async fn pending_summary(State(state): State<AppState>) -> HttpResult<Json<Value>> {
    let summary = state.emulator.store().summary().await;
    Ok(Json(serde_json::to_value(summary).map_err(Error::from)?))
}

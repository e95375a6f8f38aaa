//! HTTP handlers for the hosting layer.
//!
//! The real downstream endpoints live outside this service; `/` and `/ping`
//! stand in for them behind the admission middleware. `/health` and
//! `/metrics` are exempt so operators can always reach them.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::middleware::AdmissionState;
use crate::response::HealthResponse;

pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "success",
        "service": "turnstile",
    }))
}

pub async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "success",
        "message": "pong",
    }))
}

pub async fn health_check(State(state): State<AdmissionState>) -> impl IntoResponse {
    Json(HealthResponse::healthy(state.control.tracked_clients()))
}

pub async fn metrics_snapshot(State(state): State<AdmissionState>) -> impl IntoResponse {
    Json(state.control.metrics())
}

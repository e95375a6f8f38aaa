//! Standardized response bodies.
//!
//! Every rejection and failure leaves the service as the same envelope:
//! `{"status": "error", "code": <http code>, "message": ..., "details": ...}`.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub status: String,
    pub code: u16,
    pub message: String,
    pub details: String,
}

impl ErrorBody {
    pub fn new(code: u16, message: &str, details: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            code,
            message: message.to_string(),
            details: details.into(),
        }
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new(
            429,
            "rate limit exceeded",
            format!("requests are arriving too quickly, retry after {retry_after_secs}s"),
        )
    }

    pub fn blacklisted(retry_after_secs: u64) -> Self {
        Self::new(
            429,
            "temporarily blacklisted",
            format!("repeated rate limit violations, retry after {retry_after_secs}s"),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(500, "internal server error", details)
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Build a rejection response, attaching `Retry-After` when a retry hint is
/// available.
pub fn rejection(body: ErrorBody, retry_after: Option<Duration>) -> Response {
    let mut response = body.into_response();
    if let Some(delay) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(delay)));
    }
    response
}

/// Round a delay up to whole seconds for the `Retry-After` header.
pub fn retry_after_secs(delay: Duration) -> u64 {
    let secs = delay.as_secs();
    if delay.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tracked_clients: usize,
}

impl HealthResponse {
    pub fn healthy(tracked_clients: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tracked_clients,
        }
    }
}

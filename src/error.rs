use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::clock::ClockError;
use crate::response::ErrorBody;

/// Failures of the admission subsystem itself.
///
/// Rate-limit rejections are not errors; they are ordinary [`Decision`]
/// values. This type covers the cases where no decision could be produced at
/// all, which surface to callers as a 500 with the standard envelope.
///
/// [`Decision`]: crate::engine::Decision
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// A client record's lock was poisoned by a panicking holder.
    #[error("client state lock poisoned for {identifier}")]
    StatePoisoned { identifier: String },
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        tracing::error!(target: "turnstile::admission", error = %self, "admission check failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::internal("admission check failed"),
        )
            .into_response()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

//! Request interceptor: every inbound request is checked against the
//! admission control before it reaches a handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::engine::Decision;
use crate::limiter::AdmissionControl;
use crate::response::{rejection, retry_after_secs, ErrorBody};

/// Catch-all bucket for requests whose origin cannot be resolved. Lumping
/// them together still rate-limits them instead of waving them through.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// State shared with the admission middleware.
#[derive(Clone)]
pub struct AdmissionState {
    pub control: Arc<AdmissionControl>,
    /// Trust `X-Forwarded-For` / `X-Real-IP` over the connection address.
    /// Only safe behind a proxy that strips client-supplied values.
    pub trust_forwarded_headers: bool,
    /// Paths that bypass admission entirely.
    pub exempt_paths: Arc<Vec<String>>,
}

pub async fn admission_middleware(
    State(state): State<AdmissionState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if state.exempt_paths.iter().any(|p| p == path) {
        return next.run(request).await;
    }

    let identifier = client_identifier(&request, state.trust_forwarded_headers);
    match state.control.admit(&identifier) {
        Ok(outcome) => match outcome.decision {
            Decision::Allow => next.run(request).await,
            Decision::RejectTooSoon => {
                let secs = outcome.retry_after.map(retry_after_secs).unwrap_or(1);
                rejection(ErrorBody::rate_limited(secs), outcome.retry_after)
            }
            Decision::RejectBlacklisted => {
                let secs = outcome.retry_after.map(retry_after_secs).unwrap_or(1);
                rejection(ErrorBody::blacklisted(secs), outcome.retry_after)
            }
        },
        Err(err) => err.into_response(),
    }
}

/// Resolve the client identifier for a request.
///
/// The connection-level peer address is authoritative. Forwarding headers
/// are consulted only when explicitly configured, and anything unresolvable
/// falls into the [`UNKNOWN_CLIENT`] bucket.
fn client_identifier(request: &Request, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers {
        if let Some(forwarded) = request.headers().get("x-forwarded-for") {
            if let Ok(value) = forwarded.to_str() {
                if let Some(first) = value.split(',').next() {
                    let first = first.trim();
                    if !first.is_empty() {
                        return first.to_string();
                    }
                }
            }
        }
        if let Some(real_ip) = request.headers().get("x-real-ip") {
            if let Ok(value) = real_ip.to_str() {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn request_with_peer(addr: &str) -> Request {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>(addr.parse().unwrap()));
        request
    }

    #[test]
    fn peer_address_is_authoritative_by_default() {
        let mut request = request_with_peer("192.0.2.7:4242");
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));

        assert_eq!(client_identifier(&request, false), "192.0.2.7");
    }

    #[test]
    fn forwarded_header_wins_when_trusted() {
        let mut request = request_with_peer("192.0.2.7:4242");
        request.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        assert_eq!(client_identifier(&request, true), "203.0.113.9");
    }

    #[test]
    fn real_ip_header_is_second_choice() {
        let mut request = request_with_peer("192.0.2.7:4242");
        request
            .headers_mut()
            .insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));

        assert_eq!(client_identifier(&request, true), "203.0.113.9");
    }

    #[test]
    fn empty_forwarded_header_falls_back_to_peer() {
        let mut request = request_with_peer("192.0.2.7:4242");
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("  "));

        assert_eq!(client_identifier(&request, true), "192.0.2.7");
    }

    #[test]
    fn missing_origin_uses_the_catch_all_bucket() {
        let request = Request::new(Body::empty());
        assert_eq!(client_identifier(&request, false), UNKNOWN_CLIENT);
        assert_eq!(client_identifier(&request, true), UNKNOWN_CLIENT);
    }
}

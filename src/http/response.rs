//! Synthesized responses.
//!
//! # Responsibilities
//! - Bodies for the reserved paths and for routing misses
//! - Map forwarding failures to status codes
//!
//! # Design Decisions
//! - Plain-text bodies; proxied responses are never rewritten
//! - Upstream failures map to 502, never to a generic 500

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

pub const BANNER: &str = "Proxier is running";

pub fn banner() -> Response<Body> {
    (StatusCode::OK, BANNER).into_response()
}

pub fn liveness() -> Response<Body> {
    (StatusCode::OK, "OK").into_response()
}

pub fn route_not_found() -> Response<Body> {
    (StatusCode::NOT_FOUND, "Route not found").into_response()
}

/// The forwarder was reached with a path outside its endpoint.
pub fn invalid_endpoint() -> Response<Body> {
    (StatusCode::NOT_FOUND, "Invalid endpoint").into_response()
}

pub fn bad_gateway() -> Response<Body> {
    (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
}

/// 502 carrying the upstream error text.
pub fn proxy_error(message: impl std::fmt::Display) -> Response<Body> {
    (StatusCode::BAD_GATEWAY, format!("Proxy error: {message}")).into_response()
}

pub fn payload_too_large() -> Response<Body> {
    (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
}

pub fn bad_request(message: impl std::fmt::Display) -> Response<Body> {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

//! Response handling and transformation.
//!
//! # Responsibilities
//! - Add proxy identification headers to served responses
//! - Strip hop-by-hop headers from backend responses
//! - Build the plain-text failure responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Clients see either the backend's response or one 503, never partial retries

use axum::body::Body;
use axum::http::{
    header::{self, HeaderName, HeaderValue},
    Response, StatusCode,
};
use axum::response::IntoResponse;

use crate::http::request::strip_hop_by_hop;

pub static X_FORWARDED_BY: HeaderName = HeaderName::from_static("x-forwarded-by");
pub static X_BACKEND_SERVER: HeaderName = HeaderName::from_static("x-backend-server");

/// Prepare a backend response for the client.
pub fn attach_proxy_headers(response: &mut Response<Body>, proxy_name: &HeaderValue, endpoint: &str) {
    let headers = response.headers_mut();
    strip_hop_by_hop(headers);
    headers.insert(X_FORWARDED_BY.clone(), proxy_name.clone());
    match HeaderValue::from_str(endpoint) {
        Ok(value) => {
            headers.insert(X_BACKEND_SERVER.clone(), value);
        }
        Err(e) => tracing::warn!(backend = %endpoint, error = %e, "Endpoint not usable as header value"),
    }
}

fn plain_text(status: StatusCode, body: &'static str) -> Response<Body> {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

pub fn service_unavailable() -> Response<Body> {
    plain_text(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
}

pub fn payload_too_large() -> Response<Body> {
    plain_text(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
}

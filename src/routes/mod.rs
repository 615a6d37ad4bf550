//! HTTP route handlers
//!
//! Handlers receive the store as an explicit `Option<&dyn DocumentStore>`;
//! `None` means credentials were never resolved (degraded mode).

pub mod bubbles;
pub mod health;
pub mod submissions;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

pub use bubbles::handle_first_five;
pub use health::{health_check, readiness_check};
pub use submissions::handle_send_data;

pub type FullBody = Full<Bytes>;

/// Response with CORS open to any origin, as the frontend is served elsewhere
pub fn response(status: StatusCode, body: Bytes) -> Response<FullBody> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Serialize `body` as JSON
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    match serde_json::to_vec(body) {
        Ok(json) => {
            let mut response = response(status, Bytes::from(json));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(_) => response(
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"Failed to serialize response"),
        ),
    }
}

/// `{"error": ..., "detail": ...}`
pub fn error_response(status: StatusCode, error: &str, detail: Option<String>) -> Response<FullBody> {
    let mut body = serde_json::json!({ "error": error });
    if let Some(detail) = detail {
        body["detail"] = serde_json::Value::String(detail);
    }
    json_response(status, &body)
}

/// Status with an empty body
pub fn empty_response(status: StatusCode) -> Response<FullBody> {
    response(status, Bytes::new())
}

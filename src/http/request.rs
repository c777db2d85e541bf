//! Request identification.
//!
//! Every request gets an `x-request-id` as early as possible so log lines
//! from the router, the handler and the upstream can be correlated. The id is
//! generated by `tower_http` when the client did not send one, copied onto the
//! response, and forwarded upstream with the rest of the headers.

use axum::http::{HeaderMap, HeaderName};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Read the request id, falling back to `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

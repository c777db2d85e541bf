//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID, request timeout)
//! - Select a backend per request and forward to it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use http_body_util::BodyExt;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::TimeoutConfig;
use crate::http::request::{request_id, X_REQUEST_ID};
use crate::http::response::{bad_gateway, service_unavailable};
use crate::load_balancer::round_robin::RoundRobin;
use crate::net::InFlightTracker;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub selector: Arc<RoundRobin>,
    pub inflight: InFlightTracker,
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState, timeouts: &TimeoutConfig) -> Router {
    Router::new()
        .route("/", any(proxy_handler))
        .route("/{*path}", any(proxy_handler))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_secs(timeouts.request_secs),
        ))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}

/// Main proxy handler.
/// Selects a live backend and forwards the request to it unchanged.
///
/// A proxied request counts as in flight until its response body has been
/// streamed to the client or dropped.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let in_flight = state.inflight.track();
    let start_time = Instant::now();

    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    // Absent when the router is driven without a socket, e.g. in tests.
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let Some(backend) = state.selector.next() else {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, "No available backends");
        return service_unavailable();
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        backend = %backend.authority(),
        "Routing request"
    );

    match backend.forward(request, client_addr).await {
        Ok(response) => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                backend = %backend.authority(),
                status = response.status().as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request completed"
            );
            response.map(move |body| {
                Body::new(body.map_frame(move |frame| {
                    let _held = &in_flight;
                    frame
                }))
            })
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                backend = %backend.authority(),
                error = %e,
                "Upstream error"
            );
            bad_gateway()
        }
    }
}

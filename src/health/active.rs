//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend, one after another
//! - Update backend liveness from the probe result
//! - Log liveness transitions (and nothing else at info level)

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{Instrument, Span};

use crate::config::HealthCheckConfig;
use crate::http::client::HttpClient;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{backend::Backend, pool::BackendPool};

/// Probe timing and target.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Time between the start of consecutive ticks.
    pub interval: Duration,
    /// Bound on a single probe request.
    pub timeout: Duration,
    /// Path requested on every backend.
    pub path: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from(&HealthCheckConfig::default())
    }
}

impl From<&HealthCheckConfig> for ProbeSettings {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
            path: config.path.clone(),
        }
    }
}

/// Timer-driven liveness prober for a backend pool.
pub struct HealthProbe {
    pool: BackendPool,
    client: HttpClient,
    settings: ProbeSettings,
    stop: Shutdown,
    span: Span,
}

impl HealthProbe {
    pub fn new(pool: BackendPool, client: HttpClient, settings: ProbeSettings, span: Span) -> Self {
        Self {
            pool,
            client,
            settings,
            stop: Shutdown::new(),
            span,
        }
    }

    /// Probe on every tick until [`stop`](Self::stop) is called.
    ///
    /// The first tick fires one interval after the call. A tick that is in
    /// progress when the probe is stopped is abandoned.
    pub async fn run(&self) {
        async {
            tracing::info!(
                interval = ?self.settings.interval,
                timeout = ?self.settings.timeout,
                path = %self.settings.path,
                backends = self.pool.len(),
                "Health probe starting"
            );

            let mut ticker = time::interval_at(
                Instant::now() + self.settings.interval,
                self.settings.interval,
            );
            // A tick can take up to timeout x N; don't fire a burst afterwards.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = self.stop.cancelled() => break,
                            _ = self.check_all() => {}
                        }
                    }
                }
            }

            tracing::info!("Health probe stopped");
        }
        .instrument(self.span.clone())
        .await
    }

    /// Ask the loop to exit. Safe to call more than once, or before `run`.
    pub fn stop(&self) {
        if self.stop.trigger() {
            self.span.in_scope(|| tracing::debug!("Health probe stop requested"));
        }
    }

    /// Run one tick: probe every backend in order and record the results.
    pub async fn check_all(&self) {
        for backend in self.pool.backends() {
            let alive = self.probe(backend).await;
            let was_alive = backend.is_alive();
            backend.set_alive(alive);

            match (was_alive, alive) {
                (false, true) => {
                    tracing::info!(backend = %backend.authority(), status = "UP", "Backend status changed");
                }
                (true, false) => {
                    tracing::warn!(backend = %backend.authority(), status = "DOWN", "Backend status changed");
                }
                _ => {}
            }
        }
    }

    /// Alive means a response arrived before the timeout with status exactly 200.
    async fn probe(&self, backend: &Arc<Backend>) -> bool {
        let uri = match backend.upstream_uri(&self.settings.path, None) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(backend = %backend.authority(), error = %e, "Failed to build health check uri");
                return false;
            }
        };

        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::USER_AGENT, "rr-balancer-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(backend = %backend.authority(), error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.settings.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status() == StatusCode::OK => true,
            Ok(Ok(response)) => {
                tracing::debug!(backend = %backend.authority(), status = %response.status(), "Health check failed: non-200 status");
                false
            }
            Ok(Err(e)) => {
                tracing::debug!(backend = %backend.authority(), error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %backend.authority(), "Health check failed: timeout");
                false
            }
        }
    }
}

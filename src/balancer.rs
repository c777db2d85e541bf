//! Load balancer orchestration.
//!
//! # Responsibilities
//! - Build the backend pool, selector and health probe from configuration
//! - Run the health probe and the HTTP server as two background tasks
//! - Turn an OS signal or [`LoadBalancer::shutdown`] into one ordered shutdown:
//!   stop the probe, drain the server within a deadline, confirm both exited

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, Span};

use crate::config::validation::validate_config;
use crate::config::{BalancerConfig, ConfigError};
use crate::health::{HealthProbe, ProbeSettings};
use crate::http::{build_client, build_router, AppState};
use crate::lifecycle::{termination_signal, Shutdown};
use crate::load_balancer::pool::{BackendPool, PoolError};
use crate::load_balancer::round_robin::RoundRobin;
use crate::net::{self, InFlightTracker, ListenerError};

/// Top-level error type.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The HTTP server failed while serving.
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),

    /// `start`/`run` was called on a balancer that is already running or finished.
    #[error("load balancer already started")]
    AlreadyStarted,

    /// In-flight requests did not finish before the drain deadline.
    #[error("graceful shutdown timed out after {0:?}")]
    DrainTimeout(Duration),

    /// A background task panicked.
    #[error("background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

/// Why the balancer left its serving state.
enum Exit {
    Requested,
    ServerStopped(Result<std::io::Result<()>, JoinError>),
}

/// The request-routing engine: pool, selector, probe and listener lifecycle.
pub struct LoadBalancer {
    config: BalancerConfig,
    selector: Arc<RoundRobin>,
    probe: Arc<HealthProbe>,
    inflight: InFlightTracker,
    shutdown: Shutdown,
    started: AtomicBool,
    local_addr: OnceLock<SocketAddr>,
    span: Span,
}

impl LoadBalancer {
    /// Build the balancer. Fails on an invalid configuration or an
    /// unparseable backend list.
    pub fn new(config: BalancerConfig) -> Result<Self, BalancerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let span = tracing::info_span!("load_balancer");
        let client = build_client(&config.timeouts);
        let pool = BackendPool::from_addresses(&config.backends, &client)?;

        span.in_scope(|| {
            for backend in pool.backends() {
                tracing::info!(backend = %backend.url(), "Registered backend");
            }
            tracing::info!(backends = pool.len(), "Load balancer initialized");
        });

        let probe = HealthProbe::new(
            pool.clone(),
            client,
            ProbeSettings::from(&config.health_check),
            tracing::info_span!(parent: &span, "health_probe"),
        );

        Ok(Self {
            selector: Arc::new(RoundRobin::new(pool)),
            probe: Arc::new(probe),
            inflight: InFlightTracker::new(),
            shutdown: Shutdown::new(),
            started: AtomicBool::new(false),
            local_addr: OnceLock::new(),
            config,
            span,
        })
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    pub fn pool(&self) -> &BackendPool {
        self.selector.pool()
    }

    pub fn selector(&self) -> &Arc<RoundRobin> {
        &self.selector
    }

    /// Requests currently being proxied.
    pub fn in_flight(&self) -> usize {
        self.inflight.count()
    }

    /// The address the server is bound to, once serving has begun.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// A clone of the shutdown trigger, for other tasks.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Request a graceful shutdown. Idempotent; usable before `start`.
    pub fn shutdown(&self) {
        if self.shutdown.trigger() {
            self.span.in_scope(|| tracing::info!("Shutdown requested"));
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn start(&self) -> Result<(), BalancerError> {
        let listener = net::bind(&self.config.listener).await?;
        self.run(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    ///
    /// Returns once both background tasks have exited. A balancer runs at
    /// most once.
    pub async fn run(&self, listener: TcpListener) -> Result<(), BalancerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BalancerError::AlreadyStarted);
        }
        self.serve(listener).instrument(self.span.clone()).await
    }

    async fn serve(&self, listener: TcpListener) -> Result<(), BalancerError> {
        let local_addr = listener.local_addr().map_err(BalancerError::Serve)?;
        // `run` admits a single caller, so this is the only set.
        let _ = self.local_addr.set(local_addr);

        let probe = Arc::clone(&self.probe);
        let probe_task = tokio::spawn(async move { probe.run().await });

        let server_stop = Shutdown::new();
        let mut server_task = self.spawn_server(listener, server_stop.clone());

        tracing::info!(address = %local_addr, backends = self.pool().len(), "Load balancer listening");

        let exit = tokio::select! {
            signal = termination_signal() => {
                tracing::info!(signal = %signal, "Received termination signal, shutting down");
                Exit::Requested
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("Received shutdown request, shutting down");
                Exit::Requested
            }
            joined = &mut server_task => {
                tracing::error!("HTTP server exited unexpectedly");
                Exit::ServerStopped(joined)
            }
        };
        // Handles held elsewhere observe that the balancer is going down.
        self.shutdown.trigger();

        self.graceful_shutdown(probe_task, server_task, server_stop, exit).await
    }

    fn spawn_server(&self, listener: TcpListener, stop: Shutdown) -> JoinHandle<std::io::Result<()>> {
        let state = AppState {
            selector: Arc::clone(&self.selector),
            inflight: self.inflight.clone(),
        };
        let app = build_router(state, &self.config.timeouts)
            .into_make_service_with_connect_info::<SocketAddr>();

        tokio::spawn(
            async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { stop.cancelled().await })
                    .await
            }
            .instrument(tracing::info_span!(parent: &self.span, "http_server")),
        )
    }

    async fn graceful_shutdown(
        &self,
        probe_task: JoinHandle<()>,
        mut server_task: JoinHandle<std::io::Result<()>>,
        server_stop: Shutdown,
        exit: Exit,
    ) -> Result<(), BalancerError> {
        tracing::info!("Starting graceful shutdown");

        self.probe.stop();
        let probe_result = probe_task.await;
        match &probe_result {
            Ok(()) => tracing::info!("Health probe task exited"),
            Err(e) => tracing::error!(error = %e, "Health probe task failed"),
        }

        let server_result = match exit {
            Exit::ServerStopped(joined) => joined,
            Exit::Requested => {
                let deadline = self.config.shutdown.drain_timeout();
                server_stop.trigger();
                tracing::info!(
                    in_flight = self.inflight.count(),
                    deadline = ?deadline,
                    "Draining in-flight requests"
                );

                match tokio::time::timeout(deadline, &mut server_task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::error!(
                            deadline = ?deadline,
                            in_flight = self.inflight.count(),
                            "Drain deadline exceeded, aborting HTTP server"
                        );
                        server_task.abort();
                        // Aborted tasks resolve promptly with a cancellation error.
                        let _ = server_task.await;
                        return Err(BalancerError::DrainTimeout(deadline));
                    }
                }
            }
        };

        match server_result {
            Ok(Ok(())) => tracing::info!("HTTP server stopped"),
            Ok(Err(e)) => return Err(BalancerError::Serve(e)),
            Err(e) => return Err(BalancerError::TaskFailed(e)),
        }
        probe_result?;

        tracing::info!("Load balancer gracefully stopped");
        Ok(())
    }
}

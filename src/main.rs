//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                 LOAD BALANCER                 │
//!   Client Request        │  ┌──────────┐   ┌─────────────┐   ┌────────┐  │
//!   ──────────────────────┼─▶│ listener │──▶│ round robin │──▶│backend │──┼──▶ Backend
//!                         │  │ + router │   │  (live only)│   │forward │  │    Server
//!   Client Response       │  └──────────┘   └──────▲──────┘   └────────┘  │
//!   ◀─────────────────────┼──────────────────────  │ liveness             │
//!                         │                 ┌──────┴──────┐               │
//!                         │                 │health probe │───────────────┼──▶ GET /health
//!                         │                 └─────────────┘               │
//!                         │  lifecycle: SIGINT/SIGTERM → stop probe       │
//!                         │             → drain server → exit             │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rr_balancer::config::load_config;
use rr_balancer::observability::init_logging;
use rr_balancer::LoadBalancer;

#[derive(Parser)]
#[command(name = "rr-balancer")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
struct Cli {
    /// Path to the config file (TOML, JSON or YAML).
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        "rr-balancer v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let balancer = match LoadBalancer::new(config) {
        Ok(balancer) => balancer,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize load balancer");
            return ExitCode::FAILURE;
        }
    };

    match balancer.start().await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Load balancer stopped with error");
            ExitCode::FAILURE
        }
    }
}

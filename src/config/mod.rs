//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON/YAML, chosen by extension)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → handed to LoadBalancer::new
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; the backend pool never changes afterwards
//! - All fields except `backends` have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigFormat};
pub use schema::{
    BalancerConfig, HealthCheckConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ShutdownConfig, TimeoutConfig,
};

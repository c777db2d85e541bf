//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events inside their component span
//!     → logging.rs subscriber (stdout, pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Each component receives its span at construction instead of sharing a logger
//! - Request ID flows through the trace layer and upstream headers
//! - Health probe logs transitions only, so steady state is quiet

pub mod logging;

pub use logging::init_logging;

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown sources:
//!     SIGINT/SIGTERM (signals.rs) ─┐
//!     LoadBalancer::shutdown()    ─┴→ one shutdown sequence
//!
//! Shutdown sequence (balancer.rs):
//!     Stop health probe → wait for it
//!     → Stop accepting, drain in-flight requests (bounded by deadline)
//!     → Confirm both background tasks exited
//! ```
//!
//! # Design Decisions
//! - Every stop signal is a `Shutdown` token; triggering twice is harmless
//! - Shutdown has a deadline: the drain is aborted instead of hanging

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{termination_signal, TerminationSignal};

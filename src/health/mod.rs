//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each backend in turn (GET {base}/health, bounded timeout)
//!     → Set the backend's liveness flag
//!     → Log UP/DOWN on transitions only
//! ```
//!
//! # Design Decisions
//! - The probe is the only writer of liveness; request failures don't count
//! - Probes within a tick are sequential, so a tick is bounded by timeout x N
//! - Liveness is per-backend, not per-pool

pub mod active;

pub use active::{HealthProbe, ProbeSettings};

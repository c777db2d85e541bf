//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Configured addresses
//!     → pool.rs (parse, build ordered backend list once)
//!     → round_robin.rs (rotate through live backends)
//!     → backend.rs (forward request, stream response)
//! ```
//!
//! # Design Decisions
//! - Pool membership is fixed for the process lifetime
//! - Dead backends are skipped, not removed
//! - Liveness is written by the health probe only

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, ForwardError};
pub use pool::{BackendPool, PoolError};
pub use round_robin::RoundRobin;

//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bound socket, no connection limit)
//!     → axum::serve (one task per connection)
//!     → inflight.rs (per-request tracking while proxying)
//! ```

pub mod inflight;
pub mod listener;

pub use inflight::{InFlightGuard, InFlightTracker};
pub use listener::{bind, ListenerError};

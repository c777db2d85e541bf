//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → [round robin picks a live backend]
//!     → client.rs (pooled upstream client)
//!     → response.rs (hop-by-hop headers, error responses)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{build_client, HttpClient};
pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState};

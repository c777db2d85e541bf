//! Round-robin HTTP load balancer library.

pub mod balancer;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;

pub use balancer::{BalancerError, LoadBalancer};
pub use config::BalancerConfig;
pub use lifecycle::Shutdown;

//! In-flight request tracking.
//!
//! The count is informational: it is logged when a drain starts and lets
//! callers see how much work the shutdown is waiting on. Waiting itself is
//! done by the server's graceful shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts requests currently being proxied.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    count: Arc<AtomicUsize>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. The returned guard decrements the count on drop.
    pub fn track(&self) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks one request's lifetime.
#[derive(Debug)]
pub struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

//! Round-robin load balancing strategy.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::load_balancer::{backend::Backend, pool::BackendPool};

/// Round-robin selector that skips dead backends.
///
/// The cursor and the liveness scan share one critical section, so concurrent
/// callers never claim the same slot. The section is O(N) and never awaits.
#[derive(Debug)]
pub struct RoundRobin {
    pool: BackendPool,
    cursor: Mutex<usize>,
}

impl RoundRobin {
    pub fn new(pool: BackendPool) -> Self {
        Self {
            pool,
            cursor: Mutex::new(0),
        }
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Pick the next live backend, or `None` when every backend is dead.
    pub fn next(&self) -> Option<Arc<Backend>> {
        let backends = self.pool.backends();
        let len = backends.len();
        if len == 0 {
            return None;
        }

        let mut cursor = self.cursor.lock();
        let start = *cursor % len;
        *cursor = cursor.wrapping_add(1);

        if backends[start].is_alive() {
            return Some(Arc::clone(&backends[start]));
        }

        for step in 1..len {
            let index = (start + step) % len;
            if backends[index].is_alive() {
                *cursor = index + 1;
                return Some(Arc::clone(&backends[index]));
            }
        }
        None
    }
}

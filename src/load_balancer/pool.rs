//! Backend pool construction.
//!
//! # Responsibilities
//! - Parse configured addresses into backends, all-or-nothing
//! - Hold the ordered, fixed membership shared by the selector and the probe

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::http::client::HttpClient;
use crate::load_balancer::backend::Backend;

/// Errors raised while building the pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("no backends configured")]
    Empty,

    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Ordered, immutable set of backends.
///
/// Cloning is cheap; every clone sees the same backends and liveness flags.
#[derive(Debug, Clone)]
pub struct BackendPool {
    backends: Arc<[Arc<Backend>]>,
}

impl BackendPool {
    /// Build a pool from base URLs, in the given order.
    ///
    /// Fails on an empty list or on the first address that is not an
    /// absolute `http` URL with a host; no partial pool is returned.
    pub fn from_addresses<S: AsRef<str>>(
        addresses: &[S],
        client: &HttpClient,
    ) -> Result<Self, PoolError> {
        if addresses.is_empty() {
            return Err(PoolError::Empty);
        }

        let backends = addresses
            .iter()
            .map(|raw| parse_address(raw.as_ref()).map(|url| Arc::new(Backend::new(url, client.clone()))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            backends: backends.into(),
        })
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Backend>> {
        self.backends.get(index)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Always false for a constructed pool.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently marked alive.
    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}

fn parse_address(raw: &str) -> Result<Url, PoolError> {
    let invalid = |reason: String| PoolError::InvalidAddress {
        address: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

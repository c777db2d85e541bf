//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server by its base URL
//! - Track liveness (written by the health probe, read by the selector)
//! - Forward requests to the upstream and stream the response back
//!
//! A failed forward is returned to the caller as-is. Liveness belongs to the
//! health probe alone, so forwarding never flips the flag.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Body;
use axum::http::{uri::InvalidUri, Request, Response, Uri, Version};
use thiserror::Error;
use url::{Position, Url};

use crate::http::client::HttpClient;
use crate::http::response::{append_forwarded_for, strip_hop_by_hop};

/// Errors raised while relaying a request to a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The upstream URI could not be assembled from the request.
    #[error("invalid upstream uri: {0}")]
    Uri(#[from] InvalidUri),

    /// Connection refused, reset, or any other transport failure.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Base URL of the backend.
    url: Url,
    /// `host:port`, used in logs.
    authority: String,
    alive: AtomicBool,
    client: HttpClient,
}

impl Backend {
    /// Create a backend that starts out alive.
    pub fn new(url: Url, client: HttpClient) -> Self {
        let authority = url[Position::BeforeHost..Position::AfterPort].to_string();
        Self {
            url,
            authority,
            alive: AtomicBool::new(true),
            client,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    /// Resolve a request path (and optional query) against the base URL.
    ///
    /// The base path is joined with exactly one slash; base and request
    /// queries are combined with `&`.
    pub fn upstream_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, InvalidUri> {
        let origin = &self.url[..Position::BeforePath];
        let base_path = self.url.path();

        let path = match (base_path.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{}{}", base_path, &path[1..]),
            (false, false) => format!("{}/{}", base_path, path),
            _ => format!("{}{}", base_path, path),
        };

        let query = match (self.url.query().filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
            (Some(base), Some(req)) => format!("?{}&{}", base, req),
            (Some(q), None) | (None, Some(q)) => format!("?{}", q),
            (None, None) => String::new(),
        };

        Uri::try_from(format!("{}{}{}", origin, path, query))
    }

    /// Relay a request to this backend.
    ///
    /// Method, end-to-end headers and body are passed through unchanged; the
    /// response body is streamed back without buffering.
    pub async fn forward(
        &self,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.upstream_uri(parts.uri.path(), parts.uri.query())?;
        // The pooled upstream connections speak HTTP/1.1 regardless of how the
        // client reached us.
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr.ip());
        }

        let response = self.client.request(Request::from_parts(parts, body)).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
pub(crate) fn test_backend(url: &str) -> std::sync::Arc<Backend> {
    let client = crate::http::client::build_client(&crate::config::TimeoutConfig::default());
    std::sync::Arc::new(Backend::new(Url::parse(url).unwrap(), client))
}

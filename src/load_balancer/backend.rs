//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream endpoint
//! - Own its liveness flag behind synchronized accessors
//! - Forward requests through the passive health decorator

use axum::body::Body;
use axum::http::Request;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::validation::{parse_endpoint, ValidationError};
use crate::health::passive::PassiveHealthCheck;
use crate::health::state::Liveness;
use crate::http::upstream::{Forward, ForwardResult, HttpForwarder, UpstreamClient};

/// A single backend server.
pub struct Backend {
    /// Endpoint exactly as configured; used as identity and in headers.
    endpoint: String,
    url: Url,
    liveness: Arc<Liveness>,
    forwarder: PassiveHealthCheck<Arc<dyn Forward>>,
}

impl Backend {
    /// Create a backend around an arbitrary forwarder. Starts UP.
    pub fn new(endpoint: &str, forwarder: Arc<dyn Forward>) -> Result<Self, ValidationError> {
        let url = parse_endpoint(endpoint)?;
        Ok(Self::with_url(endpoint, url, forwarder))
    }

    /// Create a backend that forwards over HTTP with the shared client.
    pub fn http(
        endpoint: &str,
        client: UpstreamClient,
        request_timeout: Duration,
    ) -> Result<Self, ValidationError> {
        let url = parse_endpoint(endpoint)?;
        let forwarder = HttpForwarder::new(url.clone(), client, request_timeout);
        Ok(Self::with_url(endpoint, url, Arc::new(forwarder)))
    }

    fn with_url(endpoint: &str, url: Url, forwarder: Arc<dyn Forward>) -> Self {
        let liveness = Arc::new(Liveness::default());
        Self {
            endpoint: endpoint.to_string(),
            url,
            forwarder: PassiveHealthCheck::new(endpoint, liveness.clone(), forwarder),
            liveness,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn set_alive(&self, alive: bool) {
        self.liveness.set_alive(alive);
    }

    /// Forward one request. Failures have already marked this backend DOWN
    /// by the time the result is returned.
    pub async fn forward(&self, request: Request<Body>) -> ForwardResult {
        self.forwarder.forward(request).await
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("endpoint", &self.endpoint)
            .field("alive", &self.is_alive())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn endpoint_is_kept_verbatim() {
        let b = backend("http://localhost:8081", &Scripted::ok());
        assert_eq!(b.endpoint(), "http://localhost:8081");
        assert_eq!(b.url().port(), Some(8081));
        assert!(b.is_alive());
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let forwarder: Arc<dyn Forward> = Scripted::ok();
        assert!(Backend::new("ftp://files", forwarder).is_err());
    }

    #[tokio::test]
    async fn http_backend_parses_endpoint_once_for_both_uses() {
        let client = crate::http::upstream::build_client(&crate::config::TimeoutConfig::default());

        let b = Backend::http("http://127.0.0.1:8082/api", client.clone(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(b.endpoint(), "http://127.0.0.1:8082/api");
        assert_eq!(b.url().path(), "/api");
        assert!(b.is_alive());

        assert!(Backend::http("https://127.0.0.1:8443", client, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn failed_forward_takes_backend_out_of_rotation() {
        let forwarder = Scripted::refused();
        let b = backend("http://localhost:8081", &forwarder);

        assert!(b.forward(Request::new(Body::empty())).await.is_err());
        assert!(!b.is_alive());
        assert_eq!(forwarder.calls(), 1);

        // Already DOWN: another DOWN write is a no-op.
        b.set_alive(false);
        assert!(!b.is_alive());
    }
}

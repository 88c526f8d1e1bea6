//! Upstream forwarding.
//!
//! # Responsibilities
//! - Define the `Forward` capability: one request in, one response or error out
//! - Provide the hyper-util client implementation bound to a single endpoint
//! - Enforce the per-attempt request timeout
//!
//! # Design Decisions
//! - Transport failures and timeouts are distinct error variants
//! - A response of any status is a completed exchange, never an error here
//! - One pooled client is shared by every backend forwarder

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use url::Url;

use crate::config::TimeoutConfig;
use crate::http::request::target_uri;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type ForwardResult = Result<Response<Body>, ForwardError>;

/// The shared upstream HTTP client.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Failure to complete an exchange with a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection refused, reset, DNS failure and the like.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("cannot build upstream request: {0}")]
    InvalidRequest(String),
}

impl ForwardError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Transport(_) => "transport",
            ForwardError::Timeout(_) => "timeout",
            ForwardError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Whether the failure says anything about the backend's health.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, ForwardError::Transport(_) | ForwardError::Timeout(_))
    }
}

/// A request-forwarding capability.
pub trait Forward: Send + Sync {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, ForwardResult>;
}

impl<F: Forward + ?Sized> Forward for Arc<F> {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, ForwardResult> {
        (**self).forward(request)
    }
}

/// Build the pooled client used for all backends.
pub fn build_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(timeouts.connect()));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(90))
        .build(connector)
}

/// Forwards requests to one endpoint over plain HTTP.
#[derive(Clone)]
pub struct HttpForwarder {
    endpoint: Url,
    client: UpstreamClient,
    timeout: Duration,
}

impl HttpForwarder {
    pub fn new(endpoint: Url, client: UpstreamClient, timeout: Duration) -> Self {
        Self {
            endpoint,
            client,
            timeout,
        }
    }
}

impl Forward for HttpForwarder {
    fn forward(&self, mut request: Request<Body>) -> BoxFuture<'_, ForwardResult> {
        Box::pin(async move {
            *request.uri_mut() = target_uri(&self.endpoint, request.uri())?;

            match time::timeout(self.timeout, self.client.request(request)).await {
                Ok(Ok(response)) => {
                    let (parts, body) = response.into_parts();
                    Ok(Response::from_parts(parts, Body::new(body)))
                }
                Ok(Err(e)) => Err(ForwardError::Transport(Box::new(e))),
                Err(_) => Err(ForwardError::Timeout(self.timeout)),
            }
        })
    }
}

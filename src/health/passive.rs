//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe the outcome of every real forward attempt
//! - Mark the backend DOWN on transport errors, timeouts and status >= 500
//! - Hand the outcome back to the caller unchanged
//!
//! # Design Decisions
//! - Decorator around any `Forward`; the wrapped forwarder knows nothing of health
//! - Only ever drives UP → DOWN; recovery belongs to the active checker
//! - Logs only when this observation performed the flip

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;
use std::sync::Arc;

use crate::health::state::Liveness;
use crate::http::upstream::{Forward, ForwardResult};
use crate::observability::metrics;

/// Wraps a forwarder and feeds its outcomes into a backend's liveness.
pub struct PassiveHealthCheck<F> {
    endpoint: String,
    liveness: Arc<Liveness>,
    inner: F,
}

impl<F> PassiveHealthCheck<F> {
    pub fn new(endpoint: impl Into<String>, liveness: Arc<Liveness>, inner: F) -> Self {
        Self {
            endpoint: endpoint.into(),
            liveness,
            inner,
        }
    }

    fn record_failure(&self, reason: &str) {
        metrics::record_passive_failure(&self.endpoint, reason);
        if self.liveness.mark_down() {
            tracing::warn!(
                backend = %self.endpoint,
                reason,
                "[PASSIVE] backend failed, marking DOWN"
            );
            metrics::record_backend_health(&self.endpoint, false);
        }
    }
}

impl<F: Forward> Forward for PassiveHealthCheck<F> {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, ForwardResult> {
        Box::pin(async move {
            match self.inner.forward(request).await {
                Ok(response) => {
                    if response.status().as_u16() >= 500 {
                        self.record_failure(response.status().as_str());
                    }
                    Ok(response)
                }
                Err(e) => {
                    tracing::debug!(backend = %self.endpoint, error = %e, "forward failed");
                    if e.is_backend_failure() {
                        self.record_failure(e.kind());
                    }
                    Err(e)
                }
            }
        })
    }
}

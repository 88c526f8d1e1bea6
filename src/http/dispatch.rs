//! Per-request dispatch loop.
//!
//! # Data Flow
//! ```text
//! ProxyRequest
//!     → pool.select_next()
//!         none → pause (if budget left) → select again
//!         DOWN since selection → select again
//!     → backend.forward()
//!         response (any status) → attach headers → Served
//!         transport error → select again
//!     → budget spent → Unavailable
//! ```
//!
//! Every trip around the loop consumes one attempt, whether or not it
//! reached a backend.

use axum::body::Body;
use axum::http::{HeaderValue, Response};
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::config::RetryConfig;
use crate::http::request::ProxyRequest;
use crate::http::response::{attach_proxy_headers, service_unavailable};
use crate::load_balancer::{Backend, ServerPool};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::AttemptBudget;

/// Final result of dispatching one request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A backend completed the exchange (any status, 5xx included).
    Served {
        backend: Arc<Backend>,
        response: Response<Body>,
        attempts: u32,
    },
    /// Every attempt was spent without a completed exchange.
    Unavailable { attempts: u32 },
}

impl DispatchOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DispatchOutcome::Served { attempts, .. } | DispatchOutcome::Unavailable { attempts } => {
                *attempts
            }
        }
    }
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> axum::response::Response {
        match self {
            DispatchOutcome::Served { response, .. } => response,
            DispatchOutcome::Unavailable { .. } => service_unavailable(),
        }
    }
}

pub struct Dispatcher {
    pool: Arc<ServerPool>,
    retry: RetryConfig,
    proxy_name: HeaderValue,
}

impl Dispatcher {
    pub fn new(pool: Arc<ServerPool>, retry: RetryConfig, proxy_name: &str) -> Self {
        let proxy_name = HeaderValue::from_str(proxy_name).unwrap_or_else(|_| {
            tracing::warn!(proxy_name, "Proxy name is not a valid header value, using default");
            HeaderValue::from_static("Nexus")
        });
        Self {
            pool,
            retry,
            proxy_name,
        }
    }

    pub async fn dispatch(&self, request: &ProxyRequest) -> DispatchOutcome {
        let mut budget = AttemptBudget::new(self.retry.max_attempts);

        while let Some(attempt) = budget.try_consume() {
            let Some(backend) = self.pool.select_next() else {
                metrics::record_attempt("no_backend");
                if !budget.is_exhausted() {
                    let pause =
                        calculate_backoff(attempt, self.retry.backoff_ms, self.retry.max_backoff_ms);
                    tracing::debug!(attempt, pause = ?pause, "No backend available, retrying selection");
                    tokio::time::sleep(pause).await;
                }
                continue;
            };

            // Liveness may have flipped since selection.
            if !backend.is_alive() {
                metrics::record_attempt("skipped");
                tracing::debug!(
                    backend = %backend.endpoint(),
                    attempt,
                    "Selected backend went DOWN, trying next"
                );
                continue;
            }

            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                backend = %backend.endpoint(),
                attempt,
                "Forwarding request"
            );

            match backend.forward(request.build()).await {
                Ok(mut response) => {
                    metrics::record_attempt("served");
                    attach_proxy_headers(&mut response, &self.proxy_name, backend.endpoint());
                    return DispatchOutcome::Served {
                        backend,
                        response,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    metrics::record_attempt("failed");
                    tracing::warn!(
                        backend = %backend.endpoint(),
                        attempt,
                        error = %e,
                        "Upstream attempt failed"
                    );
                }
            }
        }

        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            attempts = budget.used(),
            "No backend could serve request"
        );
        DispatchOutcome::Unavailable {
            attempts: budget.used(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{X_BACKEND_SERVER, X_FORWARDED_BY};
    use crate::load_balancer::backend::testing::{backend, Scripted};
    use crate::load_balancer::round_robin::RoundRobin;
    use crate::load_balancer::LoadBalancer;
    use axum::body::Bytes;
    use axum::http::{Request, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out the first backend, alive or not, for the first `stale` calls,
    /// as if it went DOWN between selection and use. Round-robin afterwards.
    #[derive(Debug, Default)]
    struct StaleFirst {
        stale: usize,
        calls: AtomicUsize,
        fallback: RoundRobin,
    }

    impl StaleFirst {
        fn new(stale: usize) -> Self {
            Self {
                stale,
                ..Self::default()
            }
        }
    }

    impl LoadBalancer for StaleFirst {
        fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
            if self.calls.fetch_add(1, Ordering::Relaxed) < self.stale {
                return backends.first().cloned();
            }
            self.fallback.next_server(backends)
        }
    }

    fn retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    fn request() -> ProxyRequest {
        Request::builder()
            .uri("/orders")
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    fn pool_of(forwarders: &[Arc<Scripted>]) -> Arc<ServerPool> {
        let pool = Arc::new(ServerPool::new());
        for (i, f) in forwarders.iter().enumerate() {
            pool.add(backend(&format!("http://10.0.0.{}:80", i + 1), f)).unwrap();
        }
        pool
    }

    fn stale_pool(forwarders: &[Arc<Scripted>], stale: usize) -> Arc<ServerPool> {
        let pool = Arc::new(ServerPool::with_balancer(Box::new(StaleFirst::new(stale))));
        for (i, f) in forwarders.iter().enumerate() {
            pool.add(backend(&format!("http://10.0.0.{}:80", i + 1), f)).unwrap();
        }
        pool.mark_status("http://10.0.0.1:80", false);
        pool
    }

    #[tokio::test]
    async fn backend_down_since_selection_is_skipped_but_costs_an_attempt() {
        let forwarders = [Scripted::ok(), Scripted::ok(), Scripted::ok()];
        let dispatcher = Dispatcher::new(stale_pool(&forwarders, 1), retry(3), "Nexus");

        let outcome = dispatcher.dispatch(&request()).await;

        assert_eq!(forwarders[0].calls(), 0);
        assert_eq!(outcome.attempts(), 2);
        match outcome {
            DispatchOutcome::Served { backend, .. } => {
                assert_eq!(backend.endpoint(), "http://10.0.0.2:80");
            }
            other => panic!("expected a served request, got {other:?}"),
        }
        assert_eq!(forwarders[1].calls(), 1);
    }

    #[tokio::test]
    async fn endless_stale_selections_exhaust_budget_without_forwarding() {
        let forwarders = [Scripted::ok(), Scripted::ok(), Scripted::ok()];
        let dispatcher = Dispatcher::new(stale_pool(&forwarders, usize::MAX), retry(4), "Nexus");

        let outcome = dispatcher.dispatch(&request()).await;

        assert!(matches!(outcome, DispatchOutcome::Unavailable { attempts: 4 }));
        assert_eq!(forwarders.iter().map(|f| f.calls()).sum::<usize>(), 0);
    }

    #[tokio::test]
    async fn transport_failure_retries_on_next_backend() {
        // The cursor starts at 0, so the first selection lands on index 1.
        let forwarders = [Scripted::ok(), Scripted::refused(), Scripted::ok()];
        let pool = pool_of(&forwarders);
        let dispatcher = Dispatcher::new(pool.clone(), retry(3), "Nexus");

        let outcome = dispatcher.dispatch(&request()).await;

        let total_calls: usize = forwarders.iter().map(|f| f.calls()).sum();
        assert_eq!(total_calls, 2);
        assert_eq!(forwarders[1].calls(), 1);
        assert_eq!(outcome.attempts(), 2);

        match outcome {
            DispatchOutcome::Served { backend, response, .. } => {
                assert_eq!(backend.endpoint(), "http://10.0.0.3:80");
                assert_eq!(response.headers().get(&X_BACKEND_SERVER).unwrap(), "http://10.0.0.3:80");
                assert_eq!(response.headers().get(&X_FORWARDED_BY).unwrap(), "Nexus");
            }
            other => panic!("expected a served request, got {other:?}"),
        }
        assert!(!pool.get("http://10.0.0.2:80").unwrap().is_alive());
    }

    #[tokio::test]
    async fn all_down_is_unavailable_without_forwarding() {
        let forwarders = [Scripted::ok(), Scripted::ok(), Scripted::ok()];
        let pool = pool_of(&forwarders);
        for b in pool.snapshot() {
            b.set_alive(false);
        }
        let dispatcher = Dispatcher::new(pool, retry(3), "Nexus");

        let outcome = dispatcher.dispatch(&request()).await;

        assert!(matches!(outcome, DispatchOutcome::Unavailable { attempts: 3 }));
        assert_eq!(forwarders.iter().map(|f| f.calls()).sum::<usize>(), 0);

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn server_error_is_returned_not_retried() {
        let forwarders = [
            Scripted::with(Some(StatusCode::INTERNAL_SERVER_ERROR)),
            Scripted::with(Some(StatusCode::INTERNAL_SERVER_ERROR)),
        ];
        let pool = pool_of(&forwarders);
        let dispatcher = Dispatcher::new(pool.clone(), retry(3), "Nexus");

        let outcome = dispatcher.dispatch(&request()).await;

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(pool.status().alive, 1);
        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(&X_BACKEND_SERVER));
    }

    #[tokio::test]
    async fn every_backend_refusing_exhausts_budget() {
        let forwarders = [Scripted::refused(), Scripted::refused(), Scripted::refused()];
        let pool = pool_of(&forwarders);
        let dispatcher = Dispatcher::new(pool.clone(), retry(3), "Nexus");

        let outcome = dispatcher.dispatch(&request()).await;

        assert!(matches!(outcome, DispatchOutcome::Unavailable { attempts: 3 }));
        for f in &forwarders {
            assert_eq!(f.calls(), 1);
        }
        assert_eq!(pool.status().alive, 0);
    }

    #[tokio::test]
    async fn budget_of_one_does_not_retry() {
        let forwarders = [Scripted::refused(), Scripted::refused()];
        let dispatcher = Dispatcher::new(pool_of(&forwarders), retry(1), "Nexus");

        let outcome = dispatcher.dispatch(&request()).await;

        assert!(matches!(outcome, DispatchOutcome::Unavailable { attempts: 1 }));
        assert_eq!(forwarders.iter().map(|f| f.calls()).sum::<usize>(), 1);
    }

    #[tokio::test]
    async fn recovers_when_backend_comes_back_mid_request() {
        let forwarders = [Scripted::ok()];
        let pool = pool_of(&forwarders);
        pool.mark_status("http://10.0.0.1:80", false);

        let dispatcher = Dispatcher::new(pool.clone(), retry(5), "Nexus");
        let reviver = {
            let pool = pool.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                pool.mark_status("http://10.0.0.1:80", true);
            })
        };

        // Backoff pauses are 1, 2, 4, 5 ms: the flag is back before the budget runs out.
        let outcome = dispatcher.dispatch(&request()).await;
        reviver.await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Served { .. }));
        assert_eq!(forwarders[0].calls(), 1);
    }
}

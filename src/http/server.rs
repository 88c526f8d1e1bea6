//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Start the health checker and the optional admin listener
//! - Serve until the shutdown signal, drain, then stop background tasks

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::ProxyConfig;
use crate::health::HealthChecker;
use crate::http::dispatch::{DispatchOutcome, Dispatcher};
use crate::http::request::ProxyRequest;
use crate::http::response::payload_too_large;
use crate::lifecycle::startup::{build_pool, StartupError};
use crate::load_balancer::ServerPool;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_size: usize,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Build the pool from configuration and wire the router.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let pool = Arc::new(build_pool(&config)?);
        Ok(Self::with_pool(config, pool))
    }

    /// Wire the router around an existing pool.
    pub fn with_pool(config: ProxyConfig, pool: Arc<ServerPool>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            pool.clone(),
            config.retries.clone(),
            &config.proxy_name,
        ));
        let state = AppState {
            dispatcher,
            max_body_size: config.max_body_size,
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            pool,
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let health = if self.config.health_check.enabled {
            Some(HealthChecker::new(self.pool.clone(), &self.config.health_check).start())
        } else {
            tracing::info!("Active health checks disabled");
            None
        };

        let admin = if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            let router = setup_admin_router(AdminState::new(
                self.pool.clone(),
                self.config.admin.api_key.clone(),
            ));
            let mut admin_shutdown = shutdown.resubscribe();
            Some(tokio::spawn(async move {
                axum::serve(admin_listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await
            }))
        } else {
            None
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut drain_deadline = shutdown.resubscribe();
        let drain_timeout = self.config.shutdown_timeout();

        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = async {
                let _ = drain_deadline.recv().await;
                tokio::time::sleep(drain_timeout).await;
            } => {
                tracing::warn!(timeout = ?drain_timeout, "Drain deadline passed, closing remaining connections");
            }
        }

        if let Some(handle) = health {
            handle.stop().await;
        }
        if let Some(task) = admin {
            match task.await {
                Ok(Err(e)) => tracing::error!(error = %e, "Admin server failed"),
                Err(e) => tracing::error!(error = %e, "Admin server task panicked"),
                Ok(Ok(())) => {}
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn pool(&self) -> Arc<ServerPool> {
        self.pool.clone()
    }

    /// The proxy router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Main proxy handler.
/// Buffers the request, then lets the dispatcher pick, forward and retry.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let prepared = match ProxyRequest::from_incoming(request, client_ip, state.max_body_size).await {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting request");
            metrics::record_request(&method, 413, "none", start_time);
            return payload_too_large();
        }
    };

    let outcome = state.dispatcher.dispatch(&prepared).await;

    match &outcome {
        DispatchOutcome::Served {
            backend, response, ..
        } => {
            metrics::record_request(&method, response.status().as_u16(), backend.endpoint(), start_time);
        }
        DispatchOutcome::Unavailable { .. } => {
            metrics::record_request(&method, 503, "none", start_time);
        }
    }

    outcome.into_response()
}

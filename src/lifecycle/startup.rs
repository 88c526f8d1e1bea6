//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the server pool from the configured endpoint list, in order
//! - Share one upstream client across every backend forwarder
//!
//! # Design Decisions
//! - Fail fast: any invalid or duplicate endpoint is fatal
//! - Every backend starts UP; the first health pass corrects that immediately

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::config::ProxyConfig;
use crate::http::upstream::build_client;
use crate::load_balancer::{Backend, PoolError, ServerPool};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Backend(#[from] ValidationError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Create a pool holding one HTTP backend per configured endpoint.
pub fn build_pool(config: &ProxyConfig) -> Result<ServerPool, StartupError> {
    let client = build_client(&config.timeouts);
    let pool = ServerPool::new();

    for endpoint in &config.backends {
        let backend = Backend::http(endpoint, client.clone(), config.timeouts.request())?;
        pool.add(backend)?;
        metrics::record_backend_health(endpoint, true);
        tracing::info!(backend = %endpoint, "Added backend");
    }

    tracing::info!(backends = pool.size(), "Load balancing across backends");
    Ok(pool)
}

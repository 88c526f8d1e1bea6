//! Nexus load balancer (v1)
//!
//! Distributes HTTP requests round-robin across a fixed pool of backends.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌─────────────────────────────────────────────────────────┐
//!                              │                         NEXUS                            │
//!                              │                                                          │
//!     Client Request           │  ┌─────────┐    ┌──────────┐    ┌──────────────┐        │
//!     ─────────────────────────┼─▶│  http   │───▶│ dispatch │───▶│ server pool  │        │
//!                              │  │ server  │    │  + retry │    │ round robin  │        │
//!                              │  └─────────┘    └────┬─────┘    └──────────────┘        │
//!                              │                      │                                   │
//!                              │                      ▼                                   │
//!     Client Response          │  ┌─────────┐    ┌──────────┐    ┌──────────────┐        │
//!     ◀────────────────────────┼──│response │◀───│ backend  │◀───│   passive    │◀───────┼──── Backend
//!                              │  │ headers │    │ forward  │    │health check  │        │     Server
//!                              │  └─────────┘    └──────────┘    └──────────────┘        │
//!                              │                                                          │
//!                              │  ┌────────────────────────────────────────────────────┐ │
//!                              │  │  active health checker (TCP probe, own task)        │ │
//!                              │  │  admin status API · metrics · lifecycle            │ │
//!                              │  └────────────────────────────────────────────────────┘ │
//!                              └─────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use nexus::config::Cli;
use nexus::observability::{logging, metrics};
use nexus::lifecycle::{signals, Shutdown};
use nexus::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);
    tracing::info!("nexus v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        max_attempts = config.retries.max_attempts,
        health_interval_ms = config.health_check.interval_ms,
        health_timeout_ms = config.health_check.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config.clone())?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Nexus is ready to accept connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Nexus shut down successfully");
    Ok(())
}

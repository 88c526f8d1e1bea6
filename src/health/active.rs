//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends with a bare TCP connect
//! - Write liveness only when the probe disagrees with the current state
//! - Stop cooperatively and let the caller join the probing task

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use url::Url;

use crate::config::HealthCheckConfig;
use crate::health::state::Transition;
use crate::lifecycle::Shutdown;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;

pub struct HealthChecker {
    pool: Arc<ServerPool>,
    interval: Duration,
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(pool: Arc<ServerPool>, config: &HealthCheckConfig) -> Self {
        Self {
            pool,
            interval: config.interval(),
            timeout: config.timeout(),
        }
    }

    /// Spawn the probing loop. The first pass runs immediately.
    pub fn start(self) -> HealthCheckHandle {
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let task = tokio::spawn(self.run(receiver));
        HealthCheckHandle { shutdown, task }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            "Health checker starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker stopped");
                    break;
                }
            }
        }
    }

    /// Probe every backend once and apply any changes.
    ///
    /// Returns the transitions that were written, one per changed backend.
    pub async fn check_all(&self) -> Vec<(String, Transition)> {
        let mut transitions = Vec::new();

        for backend in self.pool.snapshot() {
            let reachable = self.probe(backend.url()).await;
            let was_alive = backend.is_alive();

            let Some(transition) = Transition::between(was_alive, reachable) else {
                continue;
            };

            backend.set_alive(reachable);
            match transition {
                Transition::Recovered => {
                    tracing::info!(backend = %backend.endpoint(), "Backend {transition} (DOWN -> UP)")
                }
                Transition::Failed => {
                    tracing::warn!(backend = %backend.endpoint(), "Backend {transition} (UP -> DOWN)")
                }
            }
            metrics::record_transition(backend.endpoint(), transition);
            metrics::record_backend_health(backend.endpoint(), reachable);
            transitions.push((backend.endpoint().to_string(), transition));
        }

        transitions
    }

    /// TCP connect within the probe timeout.
    async fn probe(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = url.port_or_known_default().unwrap_or(80);

        match time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(host, port, error = %e, "Probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(host, port, "Probe timed out");
                false
            }
        }
    }
}

/// Handle to a running health checker.
pub struct HealthCheckHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl HealthCheckHandle {
    /// Signal the loop and wait for it to exit. An in-flight pass completes first.
    pub async fn stop(self) {
        tracing::info!("Stopping health checker");
        self.shutdown.trigger();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Health checker task failed");
        }
    }
}

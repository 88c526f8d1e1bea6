//! Metrics collection and exposition.
//!
//! # Metrics
//! - `nexus_requests_total` (counter): requests by method, status, backend
//! - `nexus_request_duration_seconds` (histogram): end-to-end latency
//! - `nexus_backend_up` (gauge): 1=UP, 0=DOWN
//! - `nexus_health_transitions_total` (counter): active checker flips
//! - `nexus_passive_failures_total` (counter): failures seen on real traffic
//! - `nexus_dispatch_attempts_total` (counter): attempts by result
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::health::state::Transition;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "nexus_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!("nexus_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("nexus_backend_up", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}

pub fn record_transition(backend: &str, transition: Transition) {
    let direction = match transition {
        Transition::Recovered => "up",
        Transition::Failed => "down",
    };
    counter!(
        "nexus_health_transitions_total",
        "backend" => backend.to_string(),
        "direction" => direction
    )
    .increment(1);
}

pub fn record_passive_failure(backend: &str, reason: &str) {
    counter!(
        "nexus_passive_failures_total",
        "backend" => backend.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_attempt(result: &'static str) {
    counter!("nexus_dispatch_attempts_total", "result" => result).increment(1);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Reads recorded values back out of a Prometheus rendering.

    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};

    pub fn recorder() -> PrometheusRecorder {
        PrometheusBuilder::new().build_recorder()
    }

    /// Current `nexus_backend_up` value for `backend`, if it was ever set.
    pub fn backend_up(recorder: &PrometheusRecorder, backend: &str) -> Option<f64> {
        let prefix = format!("nexus_backend_up{{backend=\"{backend}\"}} ");
        recorder
            .handle()
            .render()
            .lines()
            .find_map(|line| line.strip_prefix(prefix.as_str()))
            .and_then(|value| value.trim().parse().ok())
    }
}

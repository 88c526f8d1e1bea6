//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) is set at the edge and propagated upstream
//! - Liveness transitions are logged once per change, never per observation
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

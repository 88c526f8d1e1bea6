//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build pool → Start health checker → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Stop health checker
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Listeners start last (traffic only when ready)
//! - Draining has a deadline: forced exit after it
//! - Health checker is joined, so no probe runs after shutdown completes

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

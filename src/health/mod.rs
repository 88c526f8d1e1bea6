//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Immediate pass, then periodic timer
//!     → Snapshot pool, TCP-probe each backend
//!     → Write liveness only on disagreement, log the transition
//!
//! Passive health checks (passive.rs):
//!     Forward attempt fails (transport error or status >= 500)
//!     → Mark backend DOWN at once
//!
//! State (state.rs):
//!     UP ←→ DOWN, one synchronized flag per backend
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Passive detection reacts faster than the probe interval
//! - Health state is per-backend, not per-pool

pub mod active;
pub mod passive;
pub mod state;

pub use active::{HealthCheckHandle, HealthChecker};
pub use state::{Liveness, Transition};

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request dispatch:
//!     → retries.rs (per-request attempt budget)
//!     → No live backend: backoff.rs (short jittered pause, then reselect)
//!     → Transport failure: next attempt against a different backend
//! ```
//!
//! # Design Decisions
//! - Per-attempt timeouts belong to the forwarder, not to this layer
//! - No wall-clock deadline per request beyond attempts × per-attempt timeout
//! - A failed backend is already DOWN when the retry selects again

pub mod backoff;
pub mod retries;

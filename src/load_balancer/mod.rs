//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher asks for a candidate
//!     → pool.rs (read-locked backend list)
//!     → round_robin.rs (advance cursor, skip DOWN backends, pin cursor)
//!     → backend.rs (liveness check, forward through passive detection)
//!     → Return backend or None
//! ```
//!
//! # Design Decisions
//! - The pool is populated once at startup; only liveness changes afterwards
//! - Cursor advance is a lock-free atomic on the hot path
//! - DOWN backends are excluded from selection

use std::fmt::Debug;
use std::sync::Arc;

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::{PoolError, PoolStatus, ServerPool};

/// Strategy choosing the next backend from an ordered slice.
pub trait LoadBalancer: Send + Sync + Debug {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

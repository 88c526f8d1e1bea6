//! Backend liveness state.
//!
//! # States
//! - UP: backend receives traffic
//! - DOWN: backend excluded from selection
//!
//! # State Transitions
//! ```text
//! UP → DOWN: active probe fails, or passive path observes a failure
//! DOWN → UP: active probe succeeds
//! ```
//!
//! # Design Decisions
//! - No hysteresis: a single observation flips the state
//! - The cell only stores; callers that know the prior state detect transitions
//! - Transitions are logged and counted by the caller, once per change

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Synchronized liveness flag for one backend.
///
/// The flag is never handed out by reference; all access goes through
/// [`Liveness::is_alive`], [`Liveness::set_alive`] and [`Liveness::mark_down`].
#[derive(Debug)]
pub struct Liveness {
    alive: AtomicBool,
}

impl Liveness {
    pub fn new(alive: bool) -> Self {
        Self {
            alive: AtomicBool::new(alive),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Plain overwrite, no transition detection.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    /// Mark DOWN and report whether this call performed the UP → DOWN flip.
    pub fn mark_down(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new(true)
    }
}

/// A liveness change observed by the health checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// DOWN → UP.
    Recovered,
    /// UP → DOWN.
    Failed,
}

impl Transition {
    /// Transition implied by moving from `was_alive` to `alive`, if any.
    pub fn between(was_alive: bool, alive: bool) -> Option<Self> {
        match (was_alive, alive) {
            (false, true) => Some(Transition::Recovered),
            (true, false) => Some(Transition::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Recovered => "recovered",
            Transition::Failed => "failed health check",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

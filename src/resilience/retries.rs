//! Retry logic.
//!
//! # Responsibilities
//! - Bound the number of attempts one request may make
//! - Count selections that found nothing and skipped races, not just forwards
//!
//! # Design Decisions
//! - Only transport failures are retried; a 5xx is a completed exchange
//! - The budget is local to one request; nothing is carried between requests

/// Per-request attempt counter with a fixed ceiling.
#[derive(Debug, Clone)]
pub struct AttemptBudget {
    max: u32,
    used: u32,
}

impl AttemptBudget {
    pub fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    /// Consume one attempt, returning its 1-based number, or None when spent.
    pub fn try_consume(&mut self) -> Option<u32> {
        if self.used >= self.max {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }
}

//! Shutdown coordination.

use tokio::sync::broadcast;

/// One-shot cancellation signal shared by long-running tasks.
///
/// Each task holds its own receiver; [`Shutdown::trigger`] wakes all of them.
/// Receivers subscribed after the trigger never see it, so subscribe before
/// spawning.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Safe to call more than once.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

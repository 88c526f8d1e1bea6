//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
///
/// The cursor is advanced on every call, whether or not the backend it lands
/// on is alive, and is then pinned to the index actually returned so the next
/// call starts right after it.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let len = backends.len();
        if len == 0 {
            return None;
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1) % len;

        for i in 0..len {
            let index = (start + i) % len;
            let backend = &backends[index];
            if backend.is_alive() {
                self.cursor.store(index, Ordering::Relaxed);
                return Some(backend.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::testing::{backend, Scripted};

    fn backends(n: usize) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| Arc::new(backend(&format!("http://127.0.0.1:{}", 8080 + i), &Scripted::ok())))
            .collect()
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = backends(2);

        let s1 = lb.next_server(&backends).unwrap();
        let s2 = lb.next_server(&backends).unwrap();
        let s3 = lb.next_server(&backends).unwrap();

        assert_ne!(s1.endpoint(), s2.endpoint());
        assert_eq!(s1.endpoint(), s3.endpoint());
    }

    #[test]
    fn skipped_backends_still_advance_cursor() {
        let lb = RoundRobin::new();
        let backends = backends(3);
        backends[1].set_alive(false);

        // Cursor 0 → start 1 (down) → lands on 2 and pins there.
        let s = lb.next_server(&backends).unwrap();
        assert_eq!(s.endpoint(), backends[2].endpoint());
        assert_eq!(lb.cursor(), 2);

        let s = lb.next_server(&backends).unwrap();
        assert_eq!(s.endpoint(), backends[0].endpoint());
    }

    #[test]
    fn all_down_returns_none() {
        let lb = RoundRobin::new();
        let backends = backends(3);
        for b in &backends {
            b.set_alive(false);
        }
        assert!(lb.next_server(&backends).is_none());
        assert!(lb.next_server(&[]).is_none());
    }
}

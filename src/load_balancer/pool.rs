//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backend registry
//! - Select backends through a pluggable strategy (round-robin by default)
//! - Provide lock-free snapshots for the health checker
//! - Administrative liveness overrides and status reporting

use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use thiserror::Error;

use crate::load_balancer::{backend::Backend, round_robin::RoundRobin, LoadBalancer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("backend `{0}` is already registered")]
    DuplicateBackend(String),
}

/// `(alive, total)` counts for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub alive: usize,
    pub total: usize,
}

/// Ordered registry of backends with round-robin selection.
///
/// The backend list sits behind a reader/writer lock; liveness lives in each
/// backend, so flipping a flag never takes this lock.
#[derive(Debug)]
pub struct ServerPool {
    backends: RwLock<Vec<Arc<Backend>>>,
    balancer: Box<dyn LoadBalancer>,
}

impl Default for ServerPool {
    fn default() -> Self {
        Self::with_balancer(Box::new(RoundRobin::new()))
    }
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty pool selecting through `balancer` instead of round-robin.
    pub fn with_balancer(balancer: Box<dyn LoadBalancer>) -> Self {
        Self {
            backends: RwLock::new(Vec::new()),
            balancer,
        }
    }

    // The list only ever holds complete Arcs, so a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Backend>>> {
        self.backends.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a backend. Endpoints must be unique.
    pub fn add(&self, backend: Backend) -> Result<Arc<Backend>, PoolError> {
        let mut backends = self.backends.write().unwrap_or_else(PoisonError::into_inner);
        if backends.iter().any(|b| b.endpoint() == backend.endpoint()) {
            return Err(PoolError::DuplicateBackend(backend.endpoint().to_string()));
        }
        let backend = Arc::new(backend);
        backends.push(backend.clone());
        Ok(backend)
    }

    pub fn size(&self) -> usize {
        self.read().len()
    }

    /// Copy of the backend list, iterable without holding the pool lock.
    pub fn snapshot(&self) -> Vec<Arc<Backend>> {
        self.read().clone()
    }

    /// Next live backend in round-robin order, or None if all are DOWN.
    pub fn select_next(&self) -> Option<Arc<Backend>> {
        let backends = self.read();
        let selected = self.balancer.next_server(&backends);
        if selected.is_none() {
            tracing::debug!(backend_count = backends.len(), "No live backends in pool");
        }
        selected
    }

    pub fn get(&self, endpoint: &str) -> Option<Arc<Backend>> {
        self.read().iter().find(|b| b.endpoint() == endpoint).cloned()
    }

    /// Set liveness by endpoint. Returns false if no backend matches.
    pub fn mark_status(&self, endpoint: &str, alive: bool) -> bool {
        match self.get(endpoint) {
            Some(backend) => {
                backend.set_alive(alive);
                true
            }
            None => false,
        }
    }

    pub fn status(&self) -> PoolStatus {
        let backends = self.read();
        PoolStatus {
            alive: backends.iter().filter(|b| b.is_alive()).count(),
            total: backends.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::testing::{backend, Scripted};
    use std::collections::HashSet;

    fn pool(n: usize) -> ServerPool {
        let pool = ServerPool::new();
        for i in 0..n {
            pool.add(backend(&format!("http://127.0.0.1:{}", 9000 + i), &Scripted::ok()))
                .unwrap();
        }
        pool
    }

    #[test]
    fn full_cycle_visits_each_backend_once() {
        for n in 1..=5 {
            let pool = pool(n);
            let first: Vec<String> = (0..n)
                .map(|_| pool.select_next().unwrap().endpoint().to_string())
                .collect();
            let unique: HashSet<_> = first.iter().collect();
            assert_eq!(unique.len(), n);

            // Same cyclic order on the next lap.
            let second: Vec<String> = (0..n)
                .map(|_| pool.select_next().unwrap().endpoint().to_string())
                .collect();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn empty_pool_selects_nothing() {
        let pool = ServerPool::new();
        assert!(pool.select_next().is_none());
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.status(), PoolStatus { alive: 0, total: 0 });
    }

    #[test]
    fn recovers_as_soon_as_one_backend_is_up() {
        let pool = pool(3);
        for b in pool.snapshot() {
            b.set_alive(false);
        }
        assert!(pool.select_next().is_none());
        assert!(pool.select_next().is_none());

        pool.mark_status("http://127.0.0.1:9001", true);
        let picked = pool.select_next().unwrap();
        assert_eq!(picked.endpoint(), "http://127.0.0.1:9001");
        assert!(picked.is_alive());
    }

    #[test]
    fn never_selects_a_down_backend() {
        let pool = pool(4);
        pool.mark_status("http://127.0.0.1:9002", false);
        for _ in 0..20 {
            assert_ne!(pool.select_next().unwrap().endpoint(), "http://127.0.0.1:9002");
        }
        assert_eq!(pool.status(), PoolStatus { alive: 3, total: 4 });
    }

    #[test]
    fn admin_round_trip_restores_eligibility() {
        let pool = pool(2);
        assert!(pool.mark_status("http://127.0.0.1:9000", false));
        for _ in 0..4 {
            assert_eq!(pool.select_next().unwrap().endpoint(), "http://127.0.0.1:9001");
        }

        assert!(pool.mark_status("http://127.0.0.1:9000", true));
        let seen: HashSet<String> = (0..2)
            .map(|_| pool.select_next().unwrap().endpoint().to_string())
            .collect();
        assert_eq!(seen.len(), 2);

        assert!(!pool.mark_status("http://nowhere:1", true));
    }

    #[test]
    fn duplicate_endpoints_rejected() {
        let pool = pool(1);
        let err = pool
            .add(backend("http://127.0.0.1:9000", &Scripted::ok()))
            .unwrap_err();
        assert_eq!(err, PoolError::DuplicateBackend("http://127.0.0.1:9000".into()));
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn snapshot_is_detached_from_pool() {
        let pool = pool(2);
        let snapshot = pool.snapshot();
        pool.add(backend("http://127.0.0.1:9100", &Scripted::ok())).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(pool.size(), 3);
    }

    #[test]
    fn concurrent_selection_with_flapping_backend() {
        let pool = Arc::new(pool(4));
        let stable = "http://127.0.0.1:9000";

        let flapper = {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    pool.mark_status("http://127.0.0.1:9003", i % 2 == 0);
                }
            })
        };

        let selectors: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        assert!(pool.select_next().is_some());
                    }
                })
            })
            .collect();

        flapper.join().unwrap();
        for s in selectors {
            s.join().unwrap();
        }
        assert!(pool.get(stable).unwrap().is_alive());
    }
}

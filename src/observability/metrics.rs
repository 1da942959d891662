//! Planner metrics
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every compilation that goes through one `Planner`.
///
/// Relaxed ordering is enough; counters are never used for synchronization.
#[derive(Debug, Default)]
pub struct PlannerMetrics {
    plans_compiled: AtomicU64,
    plans_rejected: AtomicU64,
    bypass_plans: AtomicU64,
    single_shard_plans: AtomicU64,
    scatter_plans: AtomicU64,
    join_plans: AtomicU64,
    full_scans_denied: AtomicU64,
    catalog_lookups: AtomicU64,
}

impl PlannerMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_compiled(&self) {
        self.plans_compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_bypass(&self) {
        self.bypass_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_single_shard(&self) {
        self.single_shard_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scatter(&self) {
        self.scatter_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_join(&self) {
        self.join_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_full_scans_denied(&self) {
        self.full_scans_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_catalog_lookups(&self) {
        self.catalog_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_compiled: self.plans_compiled.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            bypass_plans: self.bypass_plans.load(Ordering::Relaxed),
            single_shard_plans: self.single_shard_plans.load(Ordering::Relaxed),
            scatter_plans: self.scatter_plans.load(Ordering::Relaxed),
            join_plans: self.join_plans.load(Ordering::Relaxed),
            full_scans_denied: self.full_scans_denied.load(Ordering::Relaxed),
            catalog_lookups: self.catalog_lookups.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of the planner counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub plans_compiled: u64,
    pub plans_rejected: u64,
    pub bypass_plans: u64,
    pub single_shard_plans: u64,
    pub scatter_plans: u64,
    pub join_plans: u64,
    pub full_scans_denied: u64,
    pub catalog_lookups: u64,
}

impl MetricsSnapshot {
    /// Total number of compilation attempts
    pub fn attempts(&self) -> u64 {
        self.plans_compiled + self.plans_rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = PlannerMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increments() {
        let metrics = PlannerMetrics::new();
        metrics.increment_compiled();
        metrics.increment_compiled();
        metrics.increment_rejected();
        metrics.increment_scatter();
        metrics.increment_catalog_lookups();

        let snap = metrics.snapshot();
        assert_eq!(snap.plans_compiled, 2);
        assert_eq!(snap.plans_rejected, 1);
        assert_eq!(snap.scatter_plans, 1);
        assert_eq!(snap.catalog_lookups, 1);
        assert_eq!(snap.attempts(), 3);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(PlannerMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        m.increment_compiled();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().plans_compiled, 1000);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = PlannerMetrics::new();
        metrics.increment_join();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["join_plans"], 1);
    }
}

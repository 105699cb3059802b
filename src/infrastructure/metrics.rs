//! Pool metrics
//!
//! Lock-free counters updated on every get/return.
//! Snapshots are taken for diagnostics and tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-pool counters
///
/// Thread-safe, updated outside the idle-set lock.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Instances built by the factory
    created: AtomicU64,
    /// Gets served from the idle set
    reused: AtomicU64,
    /// Returns that put the instance back into the idle set
    returned: AtomicU64,
    /// Instances handed to the destroy hook
    destroyed: AtomicU64,
    /// Returns rejected because the reset hook failed
    reset_failures: AtomicU64,
    /// Leaked objects put back into the idle set through the deferred queue
    recovered: AtomicU64,
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub max_retained: usize,
    pub created: u64,
    pub reused: u64,
    pub returned: u64,
    pub destroyed: u64,
    pub reset_failures: u64,
    pub recovered: u64,
}

impl PoolStats {
    /// Fraction of gets served without constructing (0.0 to 1.0)
    pub fn reuse_rate(&self) -> f64 {
        let total = self.created + self.reused;
        if total == 0 {
            0.0
        } else {
            self.reused as f64 / total as f64
        }
    }
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_returned(&self) {
        self.returned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_destroyed(&self) {
        self.destroyed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reset_failure(&self) {
        self.reset_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_recovered(&self) {
        self.recovered.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters combined with the caller-supplied idle-set view
    pub fn snapshot(&self, idle: usize, max_retained: usize) -> PoolStats {
        PoolStats {
            idle,
            max_retained,
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            reset_failures: self.reset_failures.load(Ordering::Relaxed),
            recovered: self.recovered.load(Ordering::Relaxed),
        }
    }
}

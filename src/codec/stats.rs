//! Codec Statistics
//!
//! Cache-line aligned counters for high-performance concurrent access.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Live Counters
// =============================================================================

/// Per-outcome counters of one codec
///
/// Counters only ever grow; a fresh set exists only on codec re-creation.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct Stats {
    hits: AtomicU64,
    miss: AtomicU64,
    set_success: AtomicU64,
    set_error: AtomicU64,
    delete_success: AtomicU64,
    delete_error: AtomicU64,
    invalidate_success: AtomicU64,
    invalidate_error: AtomicU64,
    clear_success: AtomicU64,
    clear_error: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[inline]
fn bump_outcome(ok: bool, success: &AtomicU64, error: &AtomicU64) {
    bump(if ok { success } else { error });
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read outcome
    #[inline]
    pub fn record_get(&self, hit: bool) {
        bump_outcome(hit, &self.hits, &self.miss);
    }

    #[inline]
    pub fn record_set(&self, ok: bool) {
        bump_outcome(ok, &self.set_success, &self.set_error);
    }

    #[inline]
    pub fn record_delete(&self, ok: bool) {
        bump_outcome(ok, &self.delete_success, &self.delete_error);
    }

    #[inline]
    pub fn record_invalidate(&self, ok: bool) {
        bump_outcome(ok, &self.invalidate_success, &self.invalidate_error);
    }

    #[inline]
    pub fn record_clear(&self, ok: bool) {
        bump_outcome(ok, &self.clear_success, &self.clear_error);
    }

    /// Create a snapshot of current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            miss: self.miss.load(Ordering::Relaxed),
            set_success: self.set_success.load(Ordering::Relaxed),
            set_error: self.set_error.load(Ordering::Relaxed),
            delete_success: self.delete_success.load(Ordering::Relaxed),
            delete_error: self.delete_error.load(Ordering::Relaxed),
            invalidate_success: self.invalidate_success.load(Ordering::Relaxed),
            invalidate_error: self.invalidate_error.load(Ordering::Relaxed),
            clear_success: self.clear_success.load(Ordering::Relaxed),
            clear_error: self.clear_error.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time snapshot of codec counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub miss: u64,
    pub set_success: u64,
    pub set_error: u64,
    pub delete_success: u64,
    pub delete_error: u64,
    pub invalidate_success: u64,
    pub invalidate_error: u64,
    pub clear_success: u64,
    pub clear_error: u64,
}

impl StatsSnapshot {
    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.miss;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Counters as `(metric name, value)` pairs, in export order
    pub fn metrics(&self) -> [(&'static str, u64); 10] {
        [
            ("hit_count", self.hits),
            ("miss_count", self.miss),
            ("set_success", self.set_success),
            ("set_error", self.set_error),
            ("delete_success", self.delete_success),
            ("delete_error", self.delete_error),
            ("invalidate_success", self.invalidate_success),
            ("invalidate_error", self.invalidate_error),
            ("clear_success", self.clear_success),
            ("clear_error", self.clear_error),
        ]
    }
}

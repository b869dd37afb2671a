//! Cache Statistics Module
//!
//! Tracks read outcomes and purge activity.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads that found nothing (absent or expired)
    pub misses: u64,
    /// Stale entries removed by a read
    pub expired_reads: u64,
    /// Full purge sweeps run
    pub purges: u64,
    /// Entries removed by purge sweeps
    pub purged_entries: u64,
    /// Raw number of entries in the store, stale ones included
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Collector ==
/// Shared counters updated from any thread without locking.
#[derive(Debug, Default)]
pub struct StatsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_reads: AtomicU64,
    purges: AtomicU64,
    purged_entries: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_read(&self) {
        self.expired_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one sweep and how many entries it removed.
    pub fn record_purge(&self, removed: usize) {
        self.purges.fetch_add(1, Ordering::Relaxed);
        self.purged_entries
            .fetch_add(removed as u64, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads every counter into a `CacheStats`.
    ///
    /// Counters are read individually, so a snapshot taken under concurrent
    /// traffic may mix values from slightly different moments.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_reads: self.expired_reads.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
            purged_entries: self.purged_entries.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

//! Store Statistics Module
//!
//! Tracks hits, misses, evictions and writes for a store. Counters are atomic
//! so the stores can record from `&self` across threads.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Store Stats ==
/// Point-in-time snapshot of a store's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Reads answered from storage
    pub hits: u64,
    /// Reads that ended in NotFound (absent, expired or unreadable)
    pub misses: u64,
    /// Records removed because they were stale
    pub evictions: u64,
    /// Values persisted
    pub writes: u64,
    /// Puts dropped by policy (never-cache kind, or key already present)
    pub skipped_writes: u64,
}

impl StoreStats {
    // == Hit Rate ==
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

// == Stats Recorder ==
/// Live counters owned by a store.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    writes: AtomicU64,
    skipped_writes: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_write(&self) {
        self.skipped_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            skipped_writes: self.skipped_writes.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StatsRecorder::new().snapshot();
        assert_eq!(stats, StoreStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(StoreStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let recorder = StatsRecorder::new();
        recorder.record_hit();
        recorder.record_miss();
        assert_eq!(recorder.snapshot().hit_rate(), 0.5);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let recorder = StatsRecorder::new();
        recorder.record_hit();
        recorder.record_hit();
        assert_eq!(recorder.snapshot().hit_rate(), 1.0);
    }

    #[test]
    fn test_write_counters() {
        let recorder = StatsRecorder::new();
        recorder.record_write();
        recorder.record_skipped_write();
        recorder.record_skipped_write();
        recorder.record_evictions(3);
        let stats = recorder.snapshot();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.skipped_writes, 2);
        assert_eq!(stats.evictions, 3);
    }
}

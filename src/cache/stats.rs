//! Cache Statistics Module
//!
//! Backend memory snapshots and process-local operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of backend memory and keyspace, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Bytes in use
    pub used_memory: u64,
    /// Human readable `used_memory`
    pub used_memory_human: String,
    /// Memory ceiling in bytes, 0 when unlimited
    pub max_memory: u64,
    /// `used_memory / max_memory` as a percentage, 0 when unlimited
    pub memory_usage_percent: f64,
    /// Keys in the database
    pub key_count: u64,
    /// Successful lookups reported by the backend
    pub keyspace_hits: u64,
    /// Failed lookups reported by the backend
    pub keyspace_misses: u64,
    /// Keys the backend evicted on its own
    pub evicted_keys: u64,
    /// Whether the snapshot came from a reachable backend
    pub connected: bool,
}

impl CacheStats {
    // == Hit Rate ==
    /// keyspace_hits / (keyspace_hits + keyspace_misses), or 0.0 without lookups.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.keyspace_hits, self.keyspace_misses)
    }
}

// == Operation Counters ==
/// Counters kept by the cache store for its own calls.
#[derive(Debug, Default)]
pub struct OperationCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    failed_sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl OperationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self, stored: bool) {
        if stored {
            self.sets.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_sets.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OperationStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        OperationStats {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            failed_sets: self.failed_sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            hit_rate: ratio(hits, misses),
        }
    }
}

/// Snapshot of [`OperationCounters`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub failed_sets: u64,
    pub deletes: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Formats bytes the way Redis renders `used_memory_human` (`1.50K`, `2.00M`).
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];

    if bytes < 1024 {
        return format!("{}B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.2}{}", value, unit)
}

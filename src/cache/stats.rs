//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, expirations and dropped writes.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing what the cache has done since it was built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads that returned a decoded value
    pub hits: u64,
    /// Reads that found nothing (absent or expired)
    pub misses: u64,
    /// Entries removed because their TTL elapsed, lazily or by the janitor
    pub expirations: u64,
    /// Writes dropped because the overflow policy declined
    pub rejected_writes: u64,
    /// Reads whose payload could not be decoded
    pub decode_errors: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current accounted size in bytes
    pub used_bytes: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

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

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Counts `count` entries dropped for having expired.
    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_rejected_write(&mut self) {
        self.rejected_writes += 1;
    }

    pub fn record_decode_error(&mut self) {
        self.decode_errors += 1;
    }

    // == Update Gauges ==
    /// Refreshes the entry count and byte gauges.
    pub fn set_gauges(&mut self, total_entries: usize, used_bytes: u64) {
        self.total_entries = total_entries;
        self.used_bytes = used_bytes;
    }
}

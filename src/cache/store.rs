//! Cache Store Module
//!
//! The entry map and its byte accountant. `StoreState` is synchronous and is
//! always reached through the cache's `RwLock`, so the map and the byte
//! counter are only ever changed together.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, OverflowPolicy, PendingWrite};
use crate::error::{CacheError, Result};

// == Store State ==
/// Key-value storage with byte accounting against an optional budget.
#[derive(Debug, Default)]
pub struct StoreState {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Sum of `key.len() + payload.len()` over all entries
    used_bytes: u64,
    /// Byte budget, 0 = unbounded
    max_bytes: u64,
    /// Activity counters
    stats: CacheStats,
}

impl StoreState {
    // == Constructor ==
    /// Creates an empty store with the given byte budget (0 = unbounded).
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Replaces the budget. Existing entries are kept even if they no longer fit.
    pub fn set_max_bytes(&mut self, max_bytes: u64) {
        self.max_bytes = max_bytes;
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Presence check without expiry filtering.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Projected Bytes ==
    /// Accounted size the store would have after writing `payload_len` bytes under `key`.
    pub fn projected_bytes(&self, key: &str, payload_len: usize) -> u64 {
        match self.entries.get(key) {
            Some(existing) => {
                self.used_bytes - existing.payload.len() as u64 + payload_len as u64
            }
            None => self.used_bytes + (key.len() + payload_len) as u64,
        }
    }

    // == Insert ==
    /// Stores `payload` under `key`, consulting `policy` if the budget would be exceeded.
    ///
    /// An existing key keeps its slot and only the payload delta is accounted.
    pub fn insert(
        &mut self,
        key: &str,
        payload: Vec<u8>,
        ttl: Option<Duration>,
        type_name: &'static str,
        policy: &dyn OverflowPolicy,
    ) -> Result<()> {
        let projected = self.projected_bytes(key, payload.len());
        if self.max_bytes != 0 && projected > self.max_bytes {
            warn!(
                "Cache capacity is full ({} of {} bytes), writing '{}' needs {}",
                self.used_bytes, self.max_bytes, key, projected
            );
            let pending = PendingWrite {
                key,
                payload_len: payload.len(),
            };
            if !policy.handle(self, &pending) {
                self.stats.record_rejected_write();
                return Err(CacheError::CapacityExceeded {
                    key: key.to_string(),
                    needed: projected,
                    limit: self.max_bytes,
                });
            }
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                let new_len = payload.len() as u64;
                let old_len = entry.replace(payload, ttl, type_name) as u64;
                self.used_bytes = self.used_bytes - old_len + new_len;
                debug!("Overwrote key '{}' ({} -> {} bytes)", key, old_len, new_len);
            }
            None => {
                let entry = CacheEntry::new(payload, ttl, type_name);
                self.used_bytes += entry.accounted_size(key);
                debug!("Inserted key '{}' ({} bytes)", key, entry.payload.len());
                self.entries.insert(key.to_string(), entry);
            }
        }

        Ok(())
    }

    // == Get Live ==
    /// Returns the entry for `key` if it exists and has not expired.
    ///
    /// An expired entry is removed on the way out and reported as absent.
    /// Misses are counted here; hits are left to the caller, which only
    /// knows after decoding whether the read succeeded.
    pub fn get_live(&mut self, key: &str) -> Option<&CacheEntry> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!("Key '{}' expired on read", key);
            return None;
        }

        self.entries.get(key)
    }

    // == Remove ==
    /// Removes `key` and releases its accounted bytes.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.used_bytes -= entry.accounted_size(key);
        Some(entry)
    }

    // == Clear ==
    /// Drops every entry and resets the byte counter. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.used_bytes = 0;
        count
    }

    // == Purge Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove(key);
            debug!("Purged expired key '{}'", key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Stats ==
    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    /// Returns a snapshot of the counters with current gauges filled in.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_gauges(self.entries.len(), self.used_bytes);
        stats
    }

    /// Recomputes the accounted size from scratch.
    #[cfg(test)]
    pub(crate) fn recount_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|(key, entry)| entry.accounted_size(key))
            .sum()
    }
}

//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::Utc;

// == Cache Entry ==
/// A single stored value: serialized payload plus expiry and type metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized value
    pub payload: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = never expires
    pub expires_at: Option<i64>,
    /// Name of the type that produced `payload`
    pub type_name: &'static str,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now, or never if `ttl` is None.
    pub fn new(payload: Vec<u8>, ttl: Option<Duration>, type_name: &'static str) -> Self {
        Self {
            payload,
            expires_at: expiry_from_ttl(ttl, current_timestamp_ms()),
            type_name,
        }
    }

    // == Replace ==
    /// Overwrites payload, expiry and type in place.
    ///
    /// Returns the previous payload length so the caller can adjust its
    /// byte accounting.
    pub fn replace(
        &mut self,
        payload: Vec<u8>,
        ttl: Option<Duration>,
        type_name: &'static str,
    ) -> usize {
        let old_len = self.payload.len();
        self.payload = payload;
        self.expires_at = expiry_from_ttl(ttl, current_timestamp_ms());
        self.type_name = type_name;
        old_len
    }

    // == Accounted Size ==
    /// Bytes this entry contributes to the store budget when held under `key`.
    pub fn accounted_size(&self, key: &str) -> u64 {
        (key.len() + self.payload.len()) as u64
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute expiry for a TTL starting at `now_ms`. Saturates instead of wrapping.
pub fn expiry_from_ttl(ttl: Option<Duration>, now_ms: i64) -> Option<i64> {
    ttl.map(|ttl| {
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_add(millis)
    })
}

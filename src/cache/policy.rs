//! Overflow Policy Module
//!
//! Decides what happens when a write would push the store past its byte budget.

use std::fmt::Debug;

use tracing::{debug, warn};

use crate::cache::StoreState;

// == Pending Write ==
/// The write that triggered the overflow check.
#[derive(Debug, Clone, Copy)]
pub struct PendingWrite<'a> {
    /// Key being written
    pub key: &'a str,
    /// Length of the serialized payload
    pub payload_len: usize,
}

// == Overflow Policy ==
/// Pluggable decision made when a write would exceed the byte budget.
///
/// `handle` runs with the store's write lock held and may remove entries
/// through `store`. Returning `true` lets the write proceed, `false` drops it.
pub trait OverflowPolicy: Send + Sync + Debug {
    fn handle(&self, store: &mut StoreState, pending: &PendingWrite<'_>) -> bool;
}

// == Reject Policy ==
/// Drops the incoming write and leaves existing data untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectPolicy;

impl OverflowPolicy for RejectPolicy {
    fn handle(&self, _store: &mut StoreState, pending: &PendingWrite<'_>) -> bool {
        warn!("Cache capacity is full, discarding write to '{}'", pending.key);
        false
    }
}

// == Purge Expired Policy ==
/// Reclaims entries whose TTL already elapsed, then admits the write if it fits.
///
/// Live entries are never touched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PurgeExpiredPolicy;

impl OverflowPolicy for PurgeExpiredPolicy {
    fn handle(&self, store: &mut StoreState, pending: &PendingWrite<'_>) -> bool {
        let removed = store.purge_expired();
        let projected = store.projected_bytes(pending.key, pending.payload_len);
        let fits = projected <= store.max_bytes();

        debug!(
            "Purged {} expired entries for '{}', projected {} of {} bytes",
            removed,
            pending.key,
            projected,
            store.max_bytes()
        );
        if !fits {
            warn!("Cache capacity is still full, discarding write to '{}'", pending.key);
        }
        fits
    }
}

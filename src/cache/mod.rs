//! Cache Module
//!
//! In-memory caching with TTL expiration, byte accounting and a pluggable
//! overflow policy.

mod entry;
mod handle;
mod policy;
mod serializer;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use handle::{Cache, CacheBuilder, DEFAULT_SWEEP_INTERVAL};
pub use policy::{OverflowPolicy, PendingWrite, PurgeExpiredPolicy, RejectPolicy};
pub use serializer::{JsonSerializer, SerializeError, Serializer};
pub use stats::CacheStats;
pub use store::StoreState;

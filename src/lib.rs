//! Mini Cache - An in-process key-value cache
//!
//! Stores serialized values with TTL expiration, a byte budget enforced by a
//! pluggable overflow policy, and a background janitor sweeping expired keys.

pub mod cache;
pub mod config;
pub mod error;
pub mod size;
pub mod tasks;

pub use cache::{Cache, CacheBuilder, OverflowPolicy, PurgeExpiredPolicy, RejectPolicy};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use size::parse_memory_size;
pub use tasks::JanitorState;

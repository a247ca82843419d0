//! Configuration Module
//!
//! Loads cache settings from environment variables.

use std::env;

/// Default janitor sweep interval in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1000;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Byte budget such as "64MB"; None = unbounded
    pub max_memory: Option<String>,
    /// Interval between janitor sweeps in milliseconds
    pub sweep_interval_ms: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_MEMORY` - Byte budget, e.g. `64MB` (default: unbounded)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 1000)
    ///
    /// The budget string is validated when the cache is built.
    pub fn from_env() -> Self {
        Self {
            max_memory: env::var("CACHE_MAX_MEMORY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            sweep_interval_ms: env::var("CACHE_SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory: None,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

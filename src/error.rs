//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::size::SizeParseError;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// None of these are fatal: a failed write leaves the cache untouched and a
/// failed read leaves the stored entry in place.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Memory budget string could not be parsed
    #[error("Invalid memory size: {0}")]
    InvalidSize(#[from] SizeParseError),

    /// Value could not be serialized
    #[error("Value not supported: {0}")]
    Encode(String),

    /// Stored payload could not be decoded into the requested type
    #[error("Decode failed for key '{key}' (stored as {stored}, requested {requested}): {reason}")]
    Decode {
        key: String,
        stored: &'static str,
        requested: &'static str,
        reason: String,
    },

    /// Write would exceed the byte budget and the overflow policy declined
    #[error("Cache full: writing '{key}' needs {needed} bytes, limit is {limit}")]
    CapacityExceeded { key: String, needed: u64, limit: u64 },

    /// Invalid builder or environment configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cache was built outside a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

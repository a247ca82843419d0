//! Serializer Module
//!
//! Converts typed values to opaque payloads and back, so the store never holds
//! references to caller data.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

// == Serialize Error ==
/// Encoding or decoding failure reported by a [`Serializer`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SerializeError(pub String);

impl From<serde_json::Error> for SerializeError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

// == Serializer ==
/// Payload codec used by the cache.
///
/// Implementations must satisfy `deserialize(serialize(v)) == v` for every
/// value they accept.
pub trait Serializer: Send + Sync + 'static {
    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>, SerializeError>;

    fn deserialize<V: DeserializeOwned>(&self, payload: &[u8]) -> Result<V, SerializeError>;
}

// == JSON Serializer ==
/// Default codec backed by serde_json.
///
/// Fields serde skips (`#[serde(skip)]`) are not stored and come back as their
/// default on read.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>, SerializeError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<V: DeserializeOwned>(&self, payload: &[u8]) -> Result<V, SerializeError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

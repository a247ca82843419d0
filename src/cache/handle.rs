//! Cache Handle
//!
//! The public, thread-safe face of the cache. Wraps the [`StoreState`] in an
//! `Arc<RwLock<_>>` shared with the janitor, and owns the serializer, the
//! overflow policy and the flush flag.

use std::any::type_name;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, JsonSerializer, OverflowPolicy, RejectPolicy, Serializer, StoreState,
};
use crate::config::{CacheConfig, DEFAULT_SWEEP_INTERVAL_MS};
use crate::error::{CacheError, Result};
use crate::size::parse_memory_size;
use crate::tasks::{Janitor, JanitorState, JanitorStatus};

/// Sweep interval used when none is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS);

// == Cache ==
/// In-process key-value cache with TTL expiration and a byte budget.
///
/// Values are serialized on write and decoded into the type requested on
/// read. Share it across tasks with `Arc<Cache>`.
///
/// # Example
/// ```no_run
/// # async fn demo() -> mini_cache::error::Result<()> {
/// use std::time::Duration;
/// use mini_cache::Cache;
///
/// let cache = Cache::builder().max_memory("10MB").build()?;
/// cache.set("user:1", "alice", Some(Duration::from_secs(60))).await?;
/// let name: Option<String> = cache.get("user:1").await?;
/// cache.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Cache<S: Serializer = JsonSerializer> {
    /// Entry map and accounting, shared with the janitor
    store: Arc<RwLock<StoreState>>,
    serializer: S,
    policy: Arc<dyn OverflowPolicy>,
    /// Set while a flush is running
    flushing: AtomicBool,
    janitor: Mutex<Option<Janitor>>,
    /// Outlives the janitor handle, so `close` can be observed in progress
    janitor_status: JanitorStatus,
}

impl Cache<JsonSerializer> {
    /// Builds an unbounded JSON-backed cache with default settings.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        CacheBuilder::new().build()
    }

    pub fn builder() -> CacheBuilder<JsonSerializer> {
        CacheBuilder::new()
    }
}

impl<S: Serializer> Cache<S> {
    // == Set Max Memory ==
    /// Replaces the byte budget from a string such as `"10MB"`.
    ///
    /// Returns false and keeps the current budget if `size` does not parse.
    /// Entries already stored are never evicted by a smaller budget.
    pub async fn set_max_memory(&self, size: &str) -> bool {
        match parse_memory_size(size) {
            Ok(max_bytes) => {
                self.store.write().await.set_max_bytes(max_bytes);
                info!("Cache budget set to {} bytes", max_bytes);
                true
            }
            Err(e) => {
                warn!("Parameter size parsing error, {}", e);
                false
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, expiring after `ttl` or never if `ttl` is None.
    ///
    /// On error nothing is stored and any previous value is kept:
    /// - [`CacheError::Encode`] if the value cannot be serialized
    /// - [`CacheError::CapacityExceeded`] if the budget is full and the
    ///   overflow policy declined
    pub async fn set<V>(&self, key: &str, value: &V, ttl: Option<Duration>) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let payload = self.serializer.serialize(value).map_err(|e| {
            warn!("Value for key '{}' isn't supported, [{}]", key, e);
            CacheError::Encode(e.to_string())
        })?;

        let mut store = self.store.write().await;
        store.insert(key, payload, ttl, type_name::<V>(), self.policy.as_ref())
    }

    // == Get ==
    /// Reads `key` and decodes it as `V`.
    ///
    /// Returns `Ok(None)` if the key is absent or expired; an expired entry is
    /// removed. A payload that does not decode as `V` yields
    /// [`CacheError::Decode`] and stays in the cache.
    pub async fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        let mut store = self.store.write().await;
        let Some(entry) = store.get_live(key) else {
            return Ok(None);
        };

        let stored = entry.type_name;
        let decoded = self.serializer.deserialize::<V>(&entry.payload);
        match decoded {
            Ok(value) => {
                store.stats_mut().record_hit();
                Ok(Some(value))
            }
            Err(e) => {
                store.stats_mut().record_decode_error();
                warn!(
                    "Unmarshal failed, key: [{}], stored type: [{}], requested type: [{}], {}",
                    key,
                    stored,
                    type_name::<V>(),
                    e
                );
                Err(CacheError::Decode {
                    key: key.to_string(),
                    stored,
                    requested: type_name::<V>(),
                    reason: e.to_string(),
                })
            }
        }
    }

    // == Delete ==
    /// Removes `key`. Returns whether anything was removed.
    pub async fn del(&self, key: &str) -> bool {
        let removed = self.store.write().await.remove(key).is_some();
        if removed {
            debug!("Deleted cache key [{}]", key);
        }
        removed
    }

    // == Exists ==
    /// Reports whether `key` is stored.
    ///
    /// Expired entries not yet swept still count, so a following `get` may
    /// return `None`.
    pub async fn exists(&self, key: &str) -> bool {
        self.store.read().await.contains_key(key)
    }

    // == Flush ==
    /// Removes every entry.
    ///
    /// Returns false without waiting if another flush is already running.
    pub async fn flush(&self) -> bool {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Cache is already flushing");
            return false;
        }

        // released even if this future is dropped while waiting for the lock
        let _flag = FlushFlag(&self.flushing);
        let removed = self.store.write().await.clear();

        info!("Cache flushed, {} entries removed", removed);
        true
    }

    // == Keys ==
    /// Number of stored entries, including expired ones not yet swept.
    pub async fn keys(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Current accounted size in bytes.
    pub async fn used_bytes(&self) -> u64 {
        self.store.read().await.used_bytes()
    }

    /// Current byte budget, 0 when unbounded.
    pub async fn max_bytes(&self) -> u64 {
        self.store.read().await.max_bytes()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// State of the background sweep.
    ///
    /// Reads `StopRequested` while a `close` is waiting for the sweep to
    /// finish, and `Stopped` once it has.
    pub fn janitor_state(&self) -> JanitorState {
        self.janitor_status.get()
    }

    // == Close ==
    /// Stops the janitor and waits for it. Stored data stays readable.
    ///
    /// Calling it more than once is harmless.
    pub async fn close(&self) {
        let janitor = self.janitor.lock().await.take();
        if let Some(mut janitor) = janitor {
            janitor.stop().await;
            info!("Cache closed");
        }
    }
}

/// Clears the flush flag when dropped.
struct FlushFlag<'a>(&'a AtomicBool);

impl Drop for FlushFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// == Cache Builder ==
/// Configures and starts a [`Cache`].
#[derive(Debug)]
pub struct CacheBuilder<S: Serializer = JsonSerializer> {
    max_memory: Option<String>,
    sweep_interval: Duration,
    policy: Arc<dyn OverflowPolicy>,
    serializer: S,
}

impl Default for CacheBuilder<JsonSerializer> {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBuilder<JsonSerializer> {
    pub fn new() -> Self {
        Self {
            max_memory: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            policy: Arc::new(RejectPolicy),
            serializer: JsonSerializer,
        }
    }

    /// Starts from a loaded [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Self {
        let builder = Self::new().sweep_interval(Duration::from_millis(config.sweep_interval_ms));
        match &config.max_memory {
            Some(max_memory) => builder.max_memory(max_memory.clone()),
            None => builder,
        }
    }
}

impl<S: Serializer> CacheBuilder<S> {
    /// Byte budget such as `"1KB"` or `"512MB"`; validated by `build`.
    pub fn max_memory(mut self, size: impl Into<String>) -> Self {
        self.max_memory = Some(size.into());
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn overflow_policy<P: OverflowPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Swaps the payload codec.
    pub fn serializer<T: Serializer>(self, serializer: T) -> CacheBuilder<T> {
        CacheBuilder {
            max_memory: self.max_memory,
            sweep_interval: self.sweep_interval,
            policy: self.policy,
            serializer,
        }
    }

    // == Build ==
    /// Validates the settings and starts the janitor on the current tokio runtime.
    pub fn build(self) -> Result<Cache<S>> {
        let max_bytes = match &self.max_memory {
            Some(size) => parse_memory_size(size)?,
            None => 0,
        };

        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }

        let runtime = Handle::try_current().map_err(|e| CacheError::NoRuntime(e.to_string()))?;

        let store = Arc::new(RwLock::new(StoreState::new(max_bytes)));
        let janitor = Janitor::spawn(&runtime, Arc::clone(&store), self.sweep_interval);
        let janitor_status = janitor.status();

        info!(
            "Cache initialized: max_bytes={}, sweep_interval={:?}, policy={:?}",
            max_bytes, self.sweep_interval, self.policy
        );

        Ok(Cache {
            store,
            serializer: self.serializer,
            policy: self.policy,
            flushing: AtomicBool::new(false),
            janitor: Mutex::new(Some(janitor)),
            janitor_status,
        })
    }
}

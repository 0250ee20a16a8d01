use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::{Cache, CacheBuilder};
use moka::Expiry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// TTL applied by [`TtlCache::increment`] when it creates a counter.
pub const DEFAULT_COUNTER_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    ttl: Duration,
    expires_at: Instant,
}

impl Entry {
    fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            ttl,
            expires_at: Instant::now() + ttl,
        }
    }

    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Each entry carries its own time-to-live.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// JSON value cache with per-entry expiry.
///
/// Expired entries are never returned, whether or not eviction has run.
/// Cloning is cheap and clones share storage.
#[derive(Clone)]
pub struct TtlCache {
    inner: Cache<String, Entry>,
    counters: Arc<Mutex<()>>,
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

impl TtlCache {
    /// Bounded cache: past `max_capacity` entries moka evicts by frequency,
    /// regardless of TTL. Only for content that can be regenerated.
    pub fn new(max_capacity: u64) -> Self {
        Self::from_builder(Cache::builder().max_capacity(max_capacity))
    }

    /// No size bound; entries leave only when their TTL runs out.
    pub fn unbounded() -> Self {
        Self::from_builder(Cache::builder())
    }

    fn from_builder(builder: CacheBuilder<String, Entry, Cache<String, Entry>>) -> Self {
        Self {
            inner: builder.expire_after(PerEntryTtl).build(),
            counters: Arc::new(Mutex::new(())),
        }
    }

    pub async fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.inner.insert(key.to_string(), Entry::new(value, ttl)).await;
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .get(key)
            .await
            .filter(Entry::live)
            .map(|e| e.value)
    }

    /// Serializes `value` and stores it.
    pub async fn set_as<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), serde_json::Error> {
        let v = serde_json::to_value(value)?;
        self.set(key, v, ttl).await;
        Ok(())
    }

    /// Typed read. An entry that no longer decodes as `T` is treated as
    /// absent and logged.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let v = self.get(key).await?;
        match serde_json::from_value(v) {
            Ok(t) => Some(t),
            Err(err) => {
                tracing::warn!(key, error = %err, "cache entry failed to decode; ignoring");
                None
            }
        }
    }

    /// Returns true if a live entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.remove(key).await.is_some_and(|e| e.live())
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Adds `by` to an integer counter, creating it at zero with
    /// [`DEFAULT_COUNTER_TTL`] when missing. A non-integer entry is
    /// replaced. The remaining TTL of an existing counter is kept.
    pub async fn increment(&self, key: &str, by: i64) -> i64 {
        let _guard = self.counters.lock().await;
        let current = self.inner.get(key).await.filter(Entry::live);
        let (base, remaining) = match &current {
            Some(e) => (
                e.value.as_i64().unwrap_or(0),
                e.expires_at.saturating_duration_since(Instant::now()),
            ),
            None => (0, DEFAULT_COUNTER_TTL),
        };
        let next = base.saturating_add(by);
        self.set(key, Value::from(next), remaining).await;
        next
    }

    /// Live entries whose key starts with `prefix`, in no particular order.
    pub fn scan_prefix(&self, prefix: &str) -> Vec<(String, Value)> {
        self.inner
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.live())
            .map(|(k, e)| (k.as_ref().clone(), e.value))
            .collect()
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

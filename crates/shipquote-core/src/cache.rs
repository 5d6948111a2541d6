//! In-memory TTL cache for aggregated quotes.
//!
//! Expiry is tracked only here; cached values carry no timestamps of their own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> CacheInner<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            ttl,
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Sweeps expired entries before inserting so the map only grows with live keys.
    fn put(&mut self, key: String, value: V) {
        let now = Instant::now();
        self.clear_expired_at(now);
        self.map.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    fn clear_expired_at(&mut self, now: Instant) {
        self.map.retain(|_, entry| entry.expires_at > now);
    }
}

/// Thread-safe TTL cache keyed by string fingerprints.
#[derive(Debug, Clone)]
pub struct CacheStore<V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<V>>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(ttl))),
        }
    }

    /// Cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns a live entry. Expired entries read as absent.
    pub async fn get(&self, key: &str) -> Option<V> {
        let store = self.inner.read().await;
        store.get(key)
    }

    /// Stores `value` under `key`, replacing any previous entry. No-op when disabled.
    pub async fn put(&self, key: impl Into<String>, value: V) {
        let mut store = self.inner.write().await;
        if store.ttl.is_zero() {
            return;
        }
        store.put(key.into(), value);
    }

    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        store.clear_expired_at(Instant::now());
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of entries, including expired ones not yet swept by a `put`.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn ttl(&self) -> Duration {
        self.inner.read().await.ttl
    }

    pub async fn is_disabled(&self) -> bool {
        self.ttl().await.is_zero()
    }
}

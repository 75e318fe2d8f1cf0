//! Time-bounded cache for connector results

use cached::{Cached, TimedCache};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Thread-safe TTL cache keyed by ticker; clones share storage
pub struct SnapshotCache<V> {
    cache: Arc<Mutex<TimedCache<String, V>>>,
}

impl<V: Clone> SnapshotCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.cache.lock().await.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.cache.lock().await.cache_set(key.into(), value);
    }

    /// Cached value for `key`, or the fetcher's result which is then cached
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            debug!(key, "Cache hit");
            return Ok(value);
        }

        debug!(key, "Cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V> Clone for SnapshotCache<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

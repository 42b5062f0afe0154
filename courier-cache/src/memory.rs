//! In-memory cache store with per-entry TTL.

use crate::error::CacheResult;
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// In-memory cache store.
///
/// Entries carry their own expiry and are evicted lazily on read or via
/// [`purge_expired`](InMemoryCache::purge_expired); no background timer is
/// involved.
pub struct InMemoryCache {
    data: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl InMemoryCache {
    /// Create new in-memory cache.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Drop every expired entry.
    pub async fn purge_expired(&self) {
        let mut data = self.data.write().await;
        let now = Instant::now();
        data.retain(|_, entry| !entry.is_expired(now));
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        {
            let data = self.data.read().await;
            match data.get(key) {
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: evict before reporting a miss.
        let mut data = self.data.write().await;
        if data.get(key).is_some_and(|entry| entry.is_expired(Instant::now())) {
            data.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        let entry = CacheEntry { value, expires_at };
        self.data.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn has(&self, key: &str) -> CacheResult<bool> {
        self.get(key).await.map(|value| value.is_some())
    }

    async fn size(&self) -> CacheResult<usize> {
        Ok(self.data.read().await.len())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.data.write().await.clear();
        Ok(())
    }
}

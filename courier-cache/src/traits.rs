//! Cache store trait definition.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Cache store trait for different cache backends.
///
/// Values are JSON strings; the caller owns serialization. Implementations
/// must never assume synchronous completion: a store may be backed by the
/// local filesystem, a KV service, or anything in between.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value from the cache.
    ///
    /// Returns `Ok(Some(value))` if the key exists and has not expired,
    /// `Ok(None)` if not found, or an error if the operation fails.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a value in the cache.
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    /// * `value` - The JSON string value
    /// * `ttl` - Optional time-to-live; `None` retains until deleted
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Check if a key exists in the cache.
    async fn has(&self, key: &str) -> CacheResult<bool> {
        self.get(key).await.map(|value| value.is_some())
    }

    /// Number of entries currently held.
    async fn size(&self) -> CacheResult<usize>;

    /// Clear all keys from the cache.
    ///
    /// **Warning:** This operation may be destructive and affect all keys.
    async fn clear(&self) -> CacheResult<()>;
}

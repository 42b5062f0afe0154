//! Cache store capability for the Courier HTTP client.
//!
//! The orchestration layer in `courier-http` persists successful request
//! results through the [`CacheStore`] trait. Any backend that can hold
//! JSON-string values with an optional TTL qualifies; the bundled
//! [`InMemoryCache`] is the reference implementation.
//!
//! # Examples
//!
//! ```
//! use courier_cache::{CacheStore, InMemoryCache};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), courier_cache::CacheError> {
//!     let cache = InMemoryCache::new();
//!
//!     cache
//!         .set("key", "value".to_string(), Some(Duration::from_secs(60)))
//!         .await?;
//!     assert_eq!(cache.get("key").await?, Some("value".to_string()));
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use memory::InMemoryCache;
pub use traits::CacheStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::memory::InMemoryCache;
    pub use crate::traits::CacheStore;
}

//! Integration tests for courier-cache

use courier_cache::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_store_through_trait_object() {
    let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());

    cache
        .set("user:1", r#"{"name":"Alice"}"#.to_string(), None)
        .await
        .unwrap();

    assert!(cache.has("user:1").await.unwrap());
    assert_eq!(
        cache.get("user:1").await.unwrap(),
        Some(r#"{"name":"Alice"}"#.to_string())
    );
}

#[tokio::test]
async fn test_missing_key_is_none_not_error() {
    let cache = InMemoryCache::new();

    assert_eq!(cache.get("absent").await.unwrap(), None);
    assert!(!cache.has("absent").await.unwrap());
}

#[tokio::test]
async fn test_ttl_applies_per_entry() {
    let cache = InMemoryCache::new();

    cache
        .set("short", "a".to_string(), Some(Duration::from_millis(20)))
        .await
        .unwrap();
    cache
        .set("long", "b".to_string(), Some(Duration::from_secs(60)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(cache.get("short").await.unwrap(), None);
    assert_eq!(cache.get("long").await.unwrap(), Some("b".to_string()));
}

#[test]
fn test_cache_error_display() {
    let err = CacheError::Connection("refused".to_string());
    assert!(format!("{}", err).contains("refused"));

    let err = CacheError::Other("backend gone".to_string());
    assert!(format!("{}", err).contains("backend gone"));
}

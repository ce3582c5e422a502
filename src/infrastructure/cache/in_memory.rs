//! In-memory cache implementation using moka

use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Lifetime of an entry measured from its last insertion
    pub ttl: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl InMemoryCacheConfig {
    /// Creates a new configuration with specified max capacity
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Sets the entry TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe bounded LRU cache with a fixed TTL
///
/// Expiry is checked against the entry's insertion instant on every read so a
/// stale value is never returned, even before moka reclaims it.
pub struct InMemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: MokaCache<String, CacheEntry<V>>,
    config: InMemoryCacheConfig,
    _value: PhantomData<fn() -> V>,
}

impl<V> Debug for InMemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("config", &self.config)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl<V> InMemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new in-memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new in-memory cache with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            cache,
            config,
            _value: PhantomData,
        }
    }

    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    /// Apply pending evictions so `len` and capacity are exact
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        entry.inserted_at.elapsed() >= self.config.ttl
    }
}

impl<V> Default for InMemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> Cache<V> for InMemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>, DomainError> {
        match self.cache.get(key).await {
            Some(entry) => {
                if self.is_expired(&entry) {
                    self.cache.remove(key).await;
                    return Ok(None);
                }

                Ok(Some(entry.value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: V) -> Result<(), DomainError> {
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
        };

        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self
            .cache
            .remove(key)
            .await
            .is_some_and(|entry| !self.is_expired(&entry)))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    fn len(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache(capacity: u64, ttl: Duration) -> InMemoryCache<String> {
        InMemoryCache::with_config(
            InMemoryCacheConfig::default()
                .with_max_capacity(capacity)
                .with_ttl(ttl),
        )
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache: InMemoryCache<String> = InMemoryCache::new();

        cache.set("key1", "value1".to_string()).await.unwrap();

        let result = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache: InMemoryCache<String> = InMemoryCache::new();

        assert!(cache.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache: InMemoryCache<String> = InMemoryCache::new();

        cache.set("key1", "value1".to_string()).await.unwrap();

        assert!(cache.invalidate("key1").await.unwrap());
        assert!(cache.get("key1").await.unwrap().is_none());
        assert!(!cache.invalidate("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let cache = small_cache(10, Duration::from_millis(40));

        cache.set("key1", "value1".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get("key1").await.unwrap().is_none());
        cache.sync().await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_set_refreshes_insertion_time() {
        let cache = small_cache(10, Duration::from_millis(150));

        cache.set("key1", "old".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        cache.set("key1", "new".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.get("key1").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = small_cache(2, Duration::from_secs(60));

        cache.set("a", "1".to_string()).await.unwrap();
        cache.set("b", "2".to_string()).await.unwrap();
        cache.sync().await;

        // Touch `a` so `b` becomes the eviction candidate
        assert!(cache.get("a").await.unwrap().is_some());
        cache.sync().await;

        cache.set("c", "3".to_string()).await.unwrap();
        cache.sync().await;

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").await.unwrap().is_none());
        assert!(cache.get("a").await.unwrap().is_some());
        assert!(cache.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache: InMemoryCache<Vec<f32>> = InMemoryCache::new();

        cache.set("e1", vec![0.1, 0.2]).await.unwrap();
        cache.set("e2", vec![0.3, 0.4]).await.unwrap();
        cache.clear().await.unwrap();

        assert!(cache.is_empty());
        assert!(cache.get("e1").await.unwrap().is_none());
    }
}

//! # Result Cache
//!
//! Short-TTL memoization of idempotent external calls, keyed by the full
//! outbound request identity (the resolved URL). Each logical result type gets
//! its own [`ResultCache`] instance with its own namespace, so keys from
//! different call types can never collide.
//!
//! Population is cache-aside: the resilient client only writes after a miss
//! has been resolved successfully. Expiry and capacity eviction are handled by
//! moka; all entries in a namespace share the TTL fixed at construction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::resilience::CacheConfig;

/// Concurrent TTL cache for one namespace
pub struct ResultCache<V> {
    namespace: &'static str,
    cache: moka::future::Cache<String, V>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> std::fmt::Debug for ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("namespace", &self.namespace)
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Hit/miss counters for one cache namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Approximate until pending maintenance has run
    pub entries: u64,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(namespace: &'static str, config: &CacheConfig) -> Self {
        let max_capacity = u64::try_from(config.max_entries.max(1)).unwrap_or(u64::MAX);
        let cache = moka::future::Cache::builder()
            .name(namespace)
            .max_capacity(max_capacity)
            .time_to_live(config.ttl)
            .build();

        debug!(
            namespace = namespace,
            max_capacity = max_capacity,
            ttl_seconds = config.ttl.as_secs(),
            "Result cache created"
        );

        Self {
            namespace,
            cache,
            ttl: config.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Look up a live entry; expired entries are never returned
    pub async fn get(&self, key: &str) -> Option<V> {
        let result = self.cache.get(key).await;

        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(namespace = self.namespace, key = key, "Cache HIT");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(namespace = self.namespace, key = key, "Cache MISS");
        }

        result
    }

    /// Store a value under the namespace TTL
    pub async fn put(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        debug!(
            namespace = self.namespace,
            key = %key,
            ttl_seconds = self.ttl.as_secs(),
            "Cache SET"
        );
        self.cache.insert(key, value).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Run moka's deferred maintenance: expirations and capacity evictions
    pub async fn purge_expired(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl: Duration, max_entries: usize) -> ResultCache<String> {
        ResultCache::new("test", &CacheConfig { ttl, max_entries })
    }

    #[tokio::test]
    async fn test_get_returns_none_on_miss() {
        let cache = cache(Duration::from_secs(60), 10);
        assert_eq!(cache.get("nonexistent").await, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = cache(Duration::from_secs(60), 10);
        cache.put("key", "value".to_string()).await;

        assert_eq!(cache.get("key").await, Some("value".to_string()));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = cache(Duration::from_secs(60), 10);
        cache.put("key", "value".to_string()).await;
        cache.invalidate("key").await;

        assert_eq!(cache.get("key").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_returned() {
        let cache = cache(Duration::from_millis(50), 10);
        cache.put("key", "value".to_string()).await;
        assert!(cache.get("key").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        cache.purge_expired().await;
        assert_eq!(cache.get("key").await, None);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = cache(Duration::from_secs(60), 2);
        for key in ["key1", "key2", "key3", "key4"] {
            cache.put(key, key.to_string()).await;
        }

        cache.purge_expired().await;

        assert!(cache.entry_count() <= 2);
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let config = CacheConfig {
            ttl: Duration::from_secs(60),
            max_entries: 10,
        };
        let search: ResultCache<String> = ResultCache::new("search", &config);
        let release: ResultCache<String> = ResultCache::new("release", &config);
        search.put("https://api.test/x", "s".to_string()).await;

        assert_eq!(release.get("https://api.test/x").await, None);
        assert_eq!(search.namespace(), "search");
        assert!(format!("{search:?}").contains("max_capacity"));
    }
}

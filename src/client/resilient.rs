//! # Resilient Client
//!
//! Single entry point for every outbound call the engine makes. Each call is
//! composed, outermost first, as:
//!
//! 1. result cache lookup (a hit short-circuits everything below)
//! 2. circuit breaker admission
//! 3. one rate-limiter permit per logical call
//! 4. bounded retry around the transport call
//!
//! A rejection by the open breaker fails fast without consuming a permit.
//! Failures leave the facade wrapped as [`AggregatorError::Search`] or
//! [`AggregatorError::Marketplace`] depending on the call type.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::collection::TransportCollectionLookup;
use crate::client::{wire, CollectionLookup, MarketplaceScraper, Transport, UrlBuilder};
use crate::constants::cache_namespaces;
use crate::error::{AggregatorError, AggregatorResult, FailureCause, TransportError};
use crate::models::{CatalogEntry, Listing, MarketplaceQuote, Query, ReleaseDetail};
use crate::resilience::{
    CacheConfig, CacheStats, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError,
    CircuitBreakerMetrics, RateLimiter, RateLimiterConfig, ResultCache, RetryConfig,
    RetryExecutor,
};

/// Which failure family a call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Search,
    Marketplace,
}

impl CallKind {
    fn failure(self, operation: &str, cause: FailureCause) -> AggregatorError {
        let operation = operation.to_string();
        match self {
            CallKind::Search => AggregatorError::Search { operation, cause },
            CallKind::Marketplace => AggregatorError::Marketplace { operation, cause },
        }
    }
}

/// Resilience settings for one client instance
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub circuit_breaker: CircuitBreakerConfig,
    pub rate_limiter: RateLimiterConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug)]
struct ClientCaches {
    search: ResultCache<Vec<CatalogEntry>>,
    release: ResultCache<ReleaseDetail>,
    quote: ResultCache<MarketplaceQuote>,
    listings: ResultCache<Vec<Listing>>,
    collection: ResultCache<bool>,
}

impl ClientCaches {
    fn new(config: &CacheConfig) -> Self {
        Self {
            search: ResultCache::new(cache_namespaces::SEARCH, config),
            release: ResultCache::new(cache_namespaces::RELEASE, config),
            quote: ResultCache::new(cache_namespaces::MARKETPLACE_QUOTE, config),
            listings: ResultCache::new(cache_namespaces::LISTINGS, config),
            collection: ResultCache::new(cache_namespaces::COLLECTION, config),
        }
    }

    fn stats(&self) -> Vec<(&'static str, CacheStats)> {
        vec![
            (self.search.namespace(), self.search.stats()),
            (self.release.namespace(), self.release.stats()),
            (self.quote.namespace(), self.quote.stats()),
            (self.listings.namespace(), self.listings.stats()),
            (self.collection.namespace(), self.collection.stats()),
        ]
    }

    async fn purge_expired(&self) {
        self.search.purge_expired().await;
        self.release.purge_expired().await;
        self.quote.purge_expired().await;
        self.listings.purge_expired().await;
        self.collection.purge_expired().await;
    }
}

/// Cached, breaker-protected, rate-limited and retried access to the catalog
#[derive(Debug)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    urls: Arc<dyn UrlBuilder>,
    scraper: Option<Arc<dyn MarketplaceScraper>>,
    collection: Arc<dyn CollectionLookup>,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    retry: RetryExecutor,
    caches: ClientCaches,
}

impl ResilientClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        urls: Arc<dyn UrlBuilder>,
        settings: ClientSettings,
    ) -> AggregatorResult<Self> {
        settings
            .circuit_breaker
            .validate()
            .map_err(AggregatorError::Configuration)?;
        settings.retry.validate().map_err(AggregatorError::Configuration)?;
        settings.cache.validate().map_err(AggregatorError::Configuration)?;

        let collection = Arc::new(TransportCollectionLookup::new(
            Arc::clone(&transport),
            Arc::clone(&urls),
        ));

        Ok(Self {
            breaker: CircuitBreaker::new("catalog_api", settings.circuit_breaker),
            limiter: RateLimiter::new(settings.rate_limiter)?,
            retry: RetryExecutor::new(settings.retry),
            caches: ClientCaches::new(&settings.cache),
            transport,
            urls,
            scraper: None,
            collection,
        })
    }

    /// Use a marketplace scraper for listing lookups
    pub fn with_scraper(mut self, scraper: Arc<dyn MarketplaceScraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    /// Replace the default transport-backed collection lookup
    pub fn with_collection_lookup(mut self, collection: Arc<dyn CollectionLookup>) -> Self {
        self.collection = collection;
        self
    }

    pub fn urls(&self) -> &dyn UrlBuilder {
        self.urls.as_ref()
    }

    pub fn has_scraper(&self) -> bool {
        self.scraper.is_some()
    }

    /// Run one logical call through cache, breaker, limiter and retry
    ///
    /// `key` is the full request identity within `cache`'s namespace.
    pub async fn call<T, F, Fut>(
        &self,
        cache: &ResultCache<T>,
        key: &str,
        kind: CallKind,
        operation: F,
    ) -> AggregatorResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        if let Some(cached) = cache.get(key).await {
            return Ok(cached);
        }

        let limiter = &self.limiter;
        let retry = &self.retry;
        let outcome = self
            .breaker
            .execute(move || async move {
                limiter.wait_for_rate_limit().await;
                retry.execute_with_retry(operation, key).await
            })
            .await;

        match outcome {
            Ok(value) => {
                cache.put(key, value.clone()).await;
                Ok(value)
            }
            Err(CircuitBreakerError::CircuitOpen { component }) => {
                debug!(key = key, component = %component, "Call rejected by open circuit");
                Err(kind.failure(key, FailureCause::CircuitOpen { component }))
            }
            Err(CircuitBreakerError::OperationFailed(error)) => {
                warn!(key = key, error = %error, "Outbound call failed");
                Err(kind.failure(key, error.into()))
            }
        }
    }

    /// Catalog search for one query; barcode queries search by barcode only
    pub async fn search(&self, query: &Query) -> AggregatorResult<Vec<CatalogEntry>> {
        let url = self.urls.search_url(query);
        self.search_url(&url).await
    }

    /// Phrase search used to find a track on compilations
    pub async fn compilation_search(&self, query: &Query) -> AggregatorResult<Vec<CatalogEntry>> {
        let url = self.urls.compilation_search_url(query);
        self.search_url(&url).await
    }

    async fn search_url(&self, url: &str) -> AggregatorResult<Vec<CatalogEntry>> {
        let transport = &self.transport;
        self.call(&self.caches.search, url, CallKind::Search, move || async move {
            let body = transport.get_json(url).await?;
            wire::decode_search(url, body)
        })
        .await
    }

    pub async fn release(&self, release_id: u64) -> AggregatorResult<ReleaseDetail> {
        let url = self.urls.release_url(release_id);
        let url = url.as_str();
        let transport = &self.transport;
        self.call(&self.caches.release, url, CallKind::Search, move || async move {
            let body = transport.get_json(url).await?;
            wire::decode_release(url, body)
        })
        .await
    }

    pub async fn marketplace_quote(&self, release_id: u64) -> AggregatorResult<MarketplaceQuote> {
        let url = self.urls.marketplace_quote_url(release_id);
        let url = url.as_str();
        let transport = &self.transport;
        self.call(&self.caches.quote, url, CallKind::Marketplace, move || async move {
            let body = transport.get_json(url).await?;
            wire::decode_quote(url, body)
        })
        .await
    }

    /// Marketplace listings for a release; empty when no scraper is configured
    pub async fn listings(&self, release_id: u64) -> AggregatorResult<Vec<Listing>> {
        let Some(scraper) = self.scraper.as_ref() else {
            return Ok(Vec::new());
        };

        let key = format!("release:{release_id}");
        self.call(&self.caches.listings, &key, CallKind::Marketplace, move || {
            scraper.listings_for_release(release_id)
        })
        .await
    }

    /// Collection ownership; failures belong to the marketplace family
    pub async fn owned_by_user(&self, username: &str, release_id: u64) -> AggregatorResult<bool> {
        let url = self.urls.collection_url(username, release_id);
        let collection = &self.collection;
        self.call(&self.caches.collection, &url, CallKind::Marketplace, move || {
            collection.release_owned_by_user(username, release_id)
        })
        .await
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn breaker_metrics(&self) -> CircuitBreakerMetrics {
        self.breaker.metrics()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Per-namespace cache counters
    pub fn cache_stats(&self) -> Vec<(&'static str, CacheStats)> {
        self.caches.stats()
    }

    /// Flush pending expirations in every namespace
    pub async fn purge_expired(&self) {
        self.caches.purge_expired().await;
    }
}

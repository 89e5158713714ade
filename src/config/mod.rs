//! # Crate Digger Configuration System
//!
//! Layered configuration for the aggregation engine: compiled-in defaults, an
//! optional TOML file, then `CRATE_DIGGER__*` environment variables. Every
//! section is optional in the file and falls back to its defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use crate_digger::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (config/crate-digger.toml if present, plus environment)
//! let manager = ConfigManager::load(None)?;
//!
//! let retry = manager.config().retry.to_resilience_config();
//! let timeout_ms = manager.config().orchestration.per_query_timeout_ms;
//! # let _ = (retry, timeout_ms);
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::ClientSettings;
use crate::constants::{self, catalog, formats, resilience as defaults};
use crate::error::{AggregatorError, AggregatorResult};
use crate::marketplace::ListingSelectors;
use crate::orchestration::{WorkerPoolConfig, WorkerPools};
use crate::resilience::{CacheConfig, CircuitBreakerConfig, RateLimiterConfig, RetryConfig};

pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub catalog: CatalogApiConfig,
    pub rate_limiter: RateLimiterSettings,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub cache: CacheSettings,
    pub pools: PoolSettings,
    pub orchestration: OrchestrationSettings,
}

/// Catalog API endpoints and request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogApiConfig {
    pub api_base_url: String,
    /// Public site, used to make display URIs absolute
    pub site_base_url: String,
    /// Personal access token appended to API requests
    pub token: Option<String>,
    pub user_agent: String,
    pub per_page: u32,
    pub request_timeout_ms: u64,
    pub marketplace_currency: String,
    /// Page layout of the public marketplace listings page
    pub listing_selectors: ListingSelectors,
}

impl Default for CatalogApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: catalog::API_BASE_URL.to_string(),
            site_base_url: catalog::SITE_BASE_URL.to_string(),
            token: None,
            user_agent: catalog::USER_AGENT.to_string(),
            per_page: catalog::PER_PAGE,
            request_timeout_ms: catalog::REQUEST_TIMEOUT_MS,
            marketplace_currency: catalog::MARKETPLACE_CURRENCY.to_string(),
            listing_selectors: ListingSelectors::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterSettings {
    pub requests_per_minute: u32,
    pub burst: u32,
    pub poll_interval_ms: u64,
}

impl Default for RateLimiterSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: defaults::REQUESTS_PER_MINUTE,
            burst: defaults::RATE_LIMIT_BURST,
            poll_interval_ms: defaults::RATE_LIMIT_POLL_INTERVAL_MS,
        }
    }
}

impl RateLimiterSettings {
    pub fn to_resilience_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_minute: self.requests_per_minute,
            burst: self.burst,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub rate_limit_cooldown_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_RETRY_ATTEMPTS,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            rate_limit_cooldown_ms: defaults::RATE_LIMIT_COOLDOWN_MS,
        }
    }
}

impl RetrySettings {
    pub fn to_resilience_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            rate_limit_cooldown: Duration::from_millis(self.rate_limit_cooldown_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// Time to stay open before probing recovery
    pub timeout_seconds: u64,
    /// Consecutive half-open successes needed to close again
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            timeout_seconds: defaults::CIRCUIT_TIMEOUT_SECONDS,
            half_open_max_calls: defaults::CIRCUIT_HALF_OPEN_MAX_CALLS,
        }
    }
}

impl CircuitBreakerSettings {
    /// Convert to resilience module's format
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: Duration::from_secs(self.timeout_seconds),
            half_open_max_calls: self.half_open_max_calls,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: defaults::CACHE_TTL_SECONDS,
            max_entries: defaults::CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheSettings {
    pub fn to_resilience_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.ttl_seconds),
            max_entries: self.max_entries,
        }
    }
}

/// Worker pool sizing per concern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub catalog_concurrency: usize,
    pub marketplace_concurrency: usize,
    pub general_concurrency: usize,
    /// Waiting tasks per pool before submitters run work themselves
    pub queue_capacity: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            catalog_concurrency: 16,
            marketplace_concurrency: 4,
            general_concurrency: 4,
            queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationSettings {
    pub per_query_timeout_ms: u64,
    /// Concrete formats the "All Vinyl" umbrella expands to
    pub vinyl_variants: Vec<String>,
    pub uk_shipping_countries: Vec<String>,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            per_query_timeout_ms: constants::PER_QUERY_TIMEOUT_MS,
            vinyl_variants: formats::DEFAULT_VINYL_VARIANTS
                .iter()
                .map(|v| v.to_string())
                .collect(),
            uk_shipping_countries: constants::UK_SHIPPING_COUNTRIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl AggregatorConfig {
    /// Validate configuration, reporting the first invalid field
    pub fn validate(&self) -> AggregatorResult<()> {
        let invalid = |field: &str, reason: &str| {
            Err(AggregatorError::Configuration(format!("{field}: {reason}")))
        };

        if self.catalog.api_base_url.trim().is_empty() {
            return invalid("catalog.api_base_url", "must not be empty");
        }
        if self.catalog.site_base_url.trim().is_empty() {
            return invalid("catalog.site_base_url", "must not be empty");
        }
        if self.catalog.per_page == 0 {
            return invalid("catalog.per_page", "must be greater than 0");
        }
        if self.catalog.request_timeout_ms == 0 {
            return invalid("catalog.request_timeout_ms", "must be greater than 0");
        }

        let component_checks = [
            ("rate_limiter", self.rate_limiter.to_resilience_config().validate()),
            ("retry", self.retry.to_resilience_config().validate()),
            (
                "circuit_breaker",
                self.circuit_breaker.to_resilience_config().validate(),
            ),
            ("cache", self.cache.to_resilience_config().validate()),
        ];
        for (section, result) in component_checks {
            if let Err(reason) = result {
                return invalid(section, &reason);
            }
        }

        if self.pools.catalog_concurrency == 0
            || self.pools.marketplace_concurrency == 0
            || self.pools.general_concurrency == 0
        {
            return invalid("pools", "every pool needs a concurrency greater than 0");
        }

        if self.orchestration.per_query_timeout_ms == 0 {
            return invalid("orchestration.per_query_timeout_ms", "must be greater than 0");
        }
        if self.orchestration.vinyl_variants.is_empty() {
            return invalid("orchestration.vinyl_variants", "must not be empty");
        }
        if self.orchestration.uk_shipping_countries.is_empty() {
            return invalid("orchestration.uk_shipping_countries", "must not be empty");
        }

        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            circuit_breaker: self.circuit_breaker.to_resilience_config(),
            rate_limiter: self.rate_limiter.to_resilience_config(),
            retry: self.retry.to_resilience_config(),
            cache: self.cache.to_resilience_config(),
        }
    }

    pub fn worker_pools(&self) -> WorkerPools {
        let pool = |concurrency| WorkerPoolConfig::new(concurrency, self.pools.queue_capacity);
        WorkerPools::new(
            pool(self.pools.catalog_concurrency),
            pool(self.pools.marketplace_concurrency),
            pool(self.pools.general_concurrency),
        )
    }

    pub fn per_query_timeout(&self) -> Duration {
        Duration::from_millis(self.orchestration.per_query_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AggregatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.rate_limiter.poll_interval_ms, 100);
        assert_eq!(config.cache.ttl_seconds, 600);
        assert_eq!(config.orchestration.vinyl_variants.len(), 5);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = AggregatorConfig::default();
        config.circuit_breaker.failure_threshold = 0;
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("circuit_breaker"));
    }

    #[test]
    fn test_empty_variants_rejected() {
        let mut config = AggregatorConfig::default();
        config.orchestration.vinyl_variants.clear();
        assert!(matches!(
            config.validate(),
            Err(AggregatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AggregatorConfig::default();
        config.pools.marketplace_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_conversions() {
        let config = AggregatorConfig::default();
        let breaker = config.circuit_breaker.to_resilience_config();
        assert_eq!(breaker.timeout, Duration::from_secs(60));
        assert_eq!(breaker.half_open_max_calls, 3);

        let pools = config.worker_pools();
        assert_eq!(pools.catalog.concurrency(), 16);
        assert_eq!(pools.marketplace.concurrency(), 4);
    }
}

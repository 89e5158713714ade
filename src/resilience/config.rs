//! # Resilience Configuration
//!
//! Per-component configuration structures for the circuit breaker, retry
//! executor, rate limiter and result cache, with validation. The file/env
//! driven settings in [`crate::config`] convert into these.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::resilience as defaults;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Time to wait in open state before attempting recovery
    pub timeout: Duration,

    /// Consecutive successful calls in half-open state needed to close circuit
    pub half_open_max_calls: u32,
}

impl CircuitBreakerConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.failure_threshold > 100 {
            return Err("failure_threshold should not exceed 100".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.half_open_max_calls == 0 {
            return Err("half_open_max_calls must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            timeout: Duration::from_secs(defaults::CIRCUIT_TIMEOUT_SECONDS),
            half_open_max_calls: defaults::CIRCUIT_HALF_OPEN_MAX_CALLS,
        }
    }
}

/// Retry policy for one logical outbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the next attempt after an ordinary failure
    pub retry_delay: Duration,

    /// Delay before the next attempt after a rate-limited failure
    pub rate_limit_cooldown: Duration,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(defaults::RETRY_DELAY_MS),
            rate_limit_cooldown: Duration::from_millis(defaults::RATE_LIMIT_COOLDOWN_MS),
        }
    }
}

/// Token bucket settings for outbound catalog requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Sustained refill rate
    pub requests_per_minute: u32,

    /// Bucket size
    pub burst: u32,

    /// Poll interval used by the waiting acquire path
    pub poll_interval: Duration,
}

impl RateLimiterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.requests_per_minute == 0 {
            return Err("requests_per_minute must be greater than 0".to_string());
        }
        if self.burst == 0 {
            return Err("burst must be greater than 0".to_string());
        }
        if self.poll_interval.is_zero() {
            return Err("poll_interval must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: defaults::REQUESTS_PER_MINUTE,
            burst: defaults::RATE_LIMIT_BURST,
            poll_interval: Duration::from_millis(defaults::RATE_LIMIT_POLL_INTERVAL_MS),
        }
    }
}

/// Result cache settings, shared by every namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl.is_zero() {
            return Err("cache ttl must be greater than 0".to_string());
        }
        if self.max_entries == 0 {
            return Err("cache max_entries must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(defaults::CACHE_TTL_SECONDS),
            max_entries: defaults::CACHE_MAX_ENTRIES,
        }
    }
}

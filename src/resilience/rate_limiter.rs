//! # Rate Limiter
//!
//! Process-wide token bucket bounding the outbound request rate to the catalog
//! API. Callers never see a "rate limit exceeded" error: they wait until a
//! permit is available.

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{AggregatorError, AggregatorResult};
use crate::resilience::RateLimiterConfig;

/// Token bucket shared by every outbound call
pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    config: RateLimiterConfig,
    permits_granted: AtomicU64,
    waits: AtomicU64,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("permits_granted", &self.permits_granted())
            .field("waits", &self.waits())
            .finish()
    }
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> AggregatorResult<Self> {
        config.validate().map_err(AggregatorError::Configuration)?;

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| AggregatorError::Configuration("requests_per_minute is zero".into()))?;
        let burst = NonZeroU32::new(config.burst)
            .ok_or_else(|| AggregatorError::Configuration("burst is zero".into()))?;

        info!(
            requests_per_minute = config.requests_per_minute,
            burst = config.burst,
            "Rate limiter initialized"
        );

        Ok(Self {
            limiter: governor::RateLimiter::direct(Quota::per_minute(per_minute).allow_burst(burst)),
            config,
            permits_granted: AtomicU64::new(0),
            waits: AtomicU64::new(0),
        })
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        let granted = self.limiter.check().is_ok();
        if granted {
            self.permits_granted.fetch_add(1, Ordering::Relaxed);
        }
        granted
    }

    /// Wait until a permit is available, polling at the configured interval
    ///
    /// Dropping the returned future abandons the wait without consuming a permit.
    pub async fn wait_for_rate_limit(&self) {
        let mut polls = 0u64;
        while !self.try_acquire() {
            if polls == 0 {
                self.waits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    poll_interval_ms = self.config.poll_interval.as_millis() as u64,
                    "Rate limit reached, waiting for permit"
                );
            }
            polls += 1;
            sleep(self.config.poll_interval).await;
        }
    }

    /// Wait for a permit without polling, woken when the bucket refills
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
        self.permits_granted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn permits_granted(&self) -> u64 {
        self.permits_granted.load(Ordering::Relaxed)
    }

    /// Number of acquisitions that had to wait at least one poll interval
    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(per_minute: u32, burst: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            requests_per_minute: per_minute,
            burst,
            poll_interval: Duration::from_millis(100),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_burst_is_available_immediately() {
        let limiter = limiter(60, 3);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.permits_granted(), 3);
    }

    #[tokio::test]
    async fn test_wait_eventually_proceeds() {
        // 600/min refills one permit every 100ms
        let limiter = limiter(600, 1);
        limiter.wait_for_rate_limit().await;

        let started = std::time::Instant::now();
        limiter.wait_for_rate_limit().await;
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(limiter.permits_granted(), 2);
        assert_eq!(limiter.waits(), 1);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refill() {
        let limiter = limiter(600, 1);
        limiter.acquire().await;
        tokio::time::timeout(Duration::from_secs(2), limiter.acquire())
            .await
            .expect("permit should refill");
        assert_eq!(limiter.permits_granted(), 2);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = RateLimiter::new(RateLimiterConfig {
            requests_per_minute: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(AggregatorError::Configuration(_))));
    }
}

//! # Retry Executor
//!
//! Runs one logical outbound call up to a bounded number of attempts, choosing
//! the inter-attempt delay from the failure's [`StatusClass`]:
//!
//! - `NotFound`: rethrown immediately, never retried
//! - `RateLimited`: long cooldown before the next attempt
//! - `Other`: short fixed delay before the next attempt
//!
//! The last failure is always returned to the caller once attempts run out.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{StatusClass, TransportError};
use crate::resilience::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before the attempt following a failure of the given class
    fn delay_for(&self, class: StatusClass) -> Option<Duration> {
        match class {
            StatusClass::NotFound => None,
            StatusClass::RateLimited => Some(self.config.rate_limit_cooldown),
            StatusClass::Other => Some(self.config.retry_delay),
        }
    }

    /// Run `operation` with bounded retries
    ///
    /// Dropping the returned future during an inter-attempt sleep cancels the
    /// remaining attempts.
    pub async fn execute_with_retry<F, Fut, T>(
        &self,
        mut operation: F,
        description: &str,
    ) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(operation = description, attempt, max_attempts, "Attempting call");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation = description, attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let class = error.class();
            let Some(delay) = self.delay_for(class) else {
                debug!(operation = description, attempt, error = %error, "Not found, not retrying");
                return Err(error);
            };

            if attempt >= max_attempts {
                warn!(
                    operation = description,
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                return Err(error);
            }

            warn!(
                operation = description,
                attempt,
                max_attempts,
                status_class = ?class,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn status(code: u16) -> TransportError {
        TransportError::Status {
            status: code,
            url: "https://api.example/test".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_immediately() {
        let executor = RetryExecutor::default();
        let attempts = &AtomicU32::new(0);

        let result = executor
            .execute_with_retry(
                move || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TransportError>(7)
                },
                "success",
            )
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_never_retried() {
        let executor = RetryExecutor::default();
        let attempts = &AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute_with_retry(
                move || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(status(404))
                },
                "missing",
            )
            .await;

        assert_eq!(result, Err(status(404)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_uses_long_cooldown() {
        let executor = RetryExecutor::default();
        let attempts = &AtomicU32::new(0);
        let started = Instant::now();

        let result = executor
            .execute_with_retry(
                move || async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(status(429))
                    } else {
                        Ok("ok")
                    }
                },
                "limited",
            )
            .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_use_short_delay_then_rethrow() {
        let executor = RetryExecutor::default();
        let attempts = &AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = executor
            .execute_with_retry(
                move || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(status(503))
                },
                "flaky",
            )
            .await;

        assert_eq!(result, Err(status(503)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(30));
    }
}

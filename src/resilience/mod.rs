//! # Resilience Module
//!
//! Protects the catalog API from overload and callers from catalog failure.
//! Every component here is an explicit, constructor-injected service with
//! internally synchronized state, so tests build isolated instances instead of
//! sharing process-wide singletons.
//!
//! ## Architecture
//!
//! - **Rate Limiter**: token bucket bounding outbound request rate
//! - **Retry Executor**: bounded retries with status-class-aware delays
//! - **Circuit Breaker**: trips after sustained failure and probes recovery
//! - **Result Cache**: short-TTL memoization keyed by request identity
//!
//! [`crate::client::ResilientClient`] composes these around the transport.
//!
//! ## Usage
//!
//! ```rust
//! use crate_digger::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     timeout: Duration::from_secs(30),
//!     half_open_max_calls: 2,
//! };
//!
//! let circuit_breaker = CircuitBreaker::new("catalog_api", config);
//!
//! let result = circuit_breaker
//!     .execute(|| async { Ok::<&str, std::io::Error>("success") })
//!     .await;
//! assert!(result.is_ok());
//! assert_eq!(circuit_breaker.state(), CircuitState::Closed);
//! # });
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod metrics;
pub mod rate_limiter;
pub mod retry;

pub use cache::{CacheStats, ResultCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::{CacheConfig, CircuitBreakerConfig, RateLimiterConfig, RetryConfig};
pub use metrics::CircuitBreakerMetrics;
pub use rate_limiter::RateLimiter;
pub use retry::RetryExecutor;

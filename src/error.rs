//! # Error Types
//!
//! Structured failure taxonomy for the aggregation engine. Transport collaborators report
//! [`TransportError`] values carrying an explicit status classification, which the retry
//! executor inspects directly. Everything above the resilient client speaks
//! [`AggregatorError`].

use thiserror::Error;

/// Classification of a transport failure, used to pick a retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// Downstream 404 equivalent, never retried
    NotFound,
    /// Downstream 429 equivalent, retried after a long cooldown
    RateLimited,
    /// Anything else, retried after a short delay
    Other,
}

/// Failure reported by a transport collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Network failure for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    /// Classify this failure for retry decisions
    pub fn class(&self) -> StatusClass {
        match self {
            TransportError::Status { status: 404, .. } => StatusClass::NotFound,
            TransportError::Status { status: 429, .. } => StatusClass::RateLimited,
            _ => StatusClass::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == StatusClass::NotFound
    }
}

/// Underlying reason for a search or marketplace failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureCause {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// A task panicked or was aborted before producing a result
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// Failures surfaced by the aggregation engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregatorError {
    #[error("Search failed during {operation}: {cause}")]
    Search {
        operation: String,
        #[source]
        cause: FailureCause,
    },

    #[error("Marketplace lookup failed during {operation}: {cause}")]
    Marketplace {
        operation: String,
        #[source]
        cause: FailureCause,
    },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    #[error("Release {release_id} could not be matched: {message}")]
    EntryFilter { release_id: u64, message: String },

    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AggregatorError {
    /// Wrap an unexpected failure at a per-query entry point as a search failure
    pub fn unexpected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        AggregatorError::Search {
            operation: operation.into(),
            cause: FailureCause::Unexpected(message.into()),
        }
    }

    /// True when the failure was a fast-fail from an open circuit breaker
    pub fn is_circuit_open(&self) -> bool {
        matches!(
            self,
            AggregatorError::Search {
                cause: FailureCause::CircuitOpen { .. },
                ..
            } | AggregatorError::Marketplace {
                cause: FailureCause::CircuitOpen { .. },
                ..
            }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AggregatorError::Cancelled { .. })
    }
}

pub type AggregatorResult<T> = std::result::Result<T, AggregatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let not_found = TransportError::Status {
            status: 404,
            url: "u".to_string(),
        };
        let limited = TransportError::Status {
            status: 429,
            url: "u".to_string(),
        };
        let server = TransportError::Status {
            status: 503,
            url: "u".to_string(),
        };
        let network = TransportError::Network {
            url: "u".to_string(),
            message: "reset".to_string(),
        };

        assert_eq!(not_found.class(), StatusClass::NotFound);
        assert_eq!(limited.class(), StatusClass::RateLimited);
        assert_eq!(server.class(), StatusClass::Other);
        assert_eq!(network.class(), StatusClass::Other);
    }

    #[test]
    fn test_circuit_open_detection() {
        let open = AggregatorError::Search {
            operation: "search".to_string(),
            cause: FailureCause::CircuitOpen {
                component: "catalog".to_string(),
            },
        };
        assert!(open.is_circuit_open());
        assert!(!AggregatorError::unexpected("search", "boom").is_circuit_open());
        assert!(matches!(
            AggregatorError::unexpected("process_query", "task panicked"),
            AggregatorError::Search {
                cause: FailureCause::Unexpected(ref message),
                ..
            } if message == "task panicked"
        ));
    }
}

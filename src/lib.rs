#![allow(clippy::doc_markdown)] // Allow technical terms like Discogs in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Crate Digger
//!
//! Resilient aggregation engine that turns a batch of loosely specified
//! music-search queries into ranked, deduplicated, price-enriched catalog
//! results.
//!
//! ## Overview
//!
//! The external catalog API is slow, rate limited and occasionally down. Every
//! outbound call therefore goes through one [`client::ResilientClient`], which
//! layers a result cache, a circuit breaker, a token-bucket rate limiter and a
//! class-aware retry executor around the raw transport.
//!
//! Above it, the [`orchestration::QueryOrchestrator`] expands each user query
//! into physical queries (for example one per vinyl format), runs the
//! [`search::SearchPipeline`] for each concurrently under a timeout, and unions
//! the results back onto the original query.
//!
//! ## Module Organization
//!
//! - [`resilience`] - Rate limiter, retry executor, circuit breaker, result cache
//! - [`client`] - Collaborator traits, HTTP transport and the resilient facade
//! - [`models`] - Queries, catalog entries, release details and result sets
//! - [`normalizer`] - Text canonicalization for matching
//! - [`search`] - Per-query search pipeline and release matching
//! - [`marketplace`] - Batched UK marketplace availability checks
//! - [`orchestration`] - Query expansion, worker pools and batch orchestration
//! - [`aggregation`] - Grouping by title and deduplication
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crate_digger::client::{CatalogUrlBuilder, HttpTransport};
//! use crate_digger::config::ConfigManager;
//! use crate_digger::models::Query;
//! use crate_digger::orchestration::QueryOrchestrator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load(None)?.into_config();
//! let transport = Arc::new(HttpTransport::new(&config.catalog)?);
//! let urls = Arc::new(CatalogUrlBuilder::new(&config.catalog)?);
//! let orchestrator = QueryOrchestrator::from_config(&config, transport, urls, None)?;
//!
//! let queries = vec![Query {
//!     artist: Some("Burial".to_string()),
//!     album: Some("Untrue".to_string()),
//!     format: Some("All Vinyl".to_string()),
//!     ..Default::default()
//! }];
//!
//! let results = orchestrator
//!     .process_batch(&queries, None, config.per_query_timeout())
//!     .await;
//! for grouped in crate_digger::aggregation::group_all(&results) {
//!     println!("{} releases, cheapest: {:?}", grouped.entry_count(), grouped.cheapest);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod marketplace;
pub mod models;
pub mod normalizer;
pub mod orchestration;
pub mod resilience;
pub mod search;
pub mod validation;

pub use aggregation::{dedupe, group, group_all};
pub use config::{AggregatorConfig, ConfigManager};
pub use error::{AggregatorError, AggregatorResult, TransportError};
pub use models::{CatalogEntry, GroupedResult, Query, QueryResult};
pub use orchestration::{BatchOptions, QueryOrchestrator};

//! # Query Orchestrator
//!
//! Runs a batch of user queries. Each query is handled by its own task, which
//! expands it into physical queries and runs the search pipeline for each of
//! them concurrently under a per-physical-query timeout. Surviving result sets
//! are unioned by release id back onto the original query.
//!
//! A batch always yields one [`QueryResult`] per input query, in input order.
//! Slow or failing physical queries contribute no entries; they never fail
//! their sibling queries or the batch.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::{MarketplaceScraper, ResilientClient, Transport, UrlBuilder};
use crate::config::{AggregatorConfig, OrchestrationSettings};
use crate::error::{AggregatorError, AggregatorResult};
use crate::logging::{log_batch_operation, log_error, log_query_operation};
use crate::marketplace::BatchMarketplaceChecker;
use crate::models::{CatalogEntry, PhysicalQuery, Query, QueryResult, ResultSet};
use crate::orchestration::{expand, WorkerPools};
use crate::search::SearchPipeline;
use crate::validation::validate_query;

/// Per-batch options
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Exclude releases already in this user's collection
    pub username: Option<String>,
    /// Overrides the configured per-physical-query timeout
    pub per_query_timeout: Option<Duration>,
    /// Keep only releases with a UK-shipping marketplace listing
    pub uk_marketplace_only: bool,
}

impl BatchOptions {
    pub fn for_user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryOrchestrator {
    client: Arc<ResilientClient>,
    pipeline: Arc<SearchPipeline>,
    checker: Arc<BatchMarketplaceChecker>,
    pools: WorkerPools,
    vinyl_variants: Arc<[String]>,
    default_timeout: Duration,
    shutdown: CancellationToken,
}

impl QueryOrchestrator {
    pub fn new(
        client: Arc<ResilientClient>,
        pools: WorkerPools,
        settings: &OrchestrationSettings,
    ) -> Self {
        let checker = Arc::new(BatchMarketplaceChecker::new(
            Arc::clone(&client),
            Arc::clone(&pools.marketplace),
            &settings.uk_shipping_countries,
        ));
        let pipeline = Arc::new(SearchPipeline::new(
            Arc::clone(&client),
            Arc::clone(&checker),
            pools.clone(),
        ));

        Self {
            client,
            pipeline,
            checker,
            pools,
            vinyl_variants: settings.vinyl_variants.clone().into(),
            default_timeout: Duration::from_millis(settings.per_query_timeout_ms),
            shutdown: CancellationToken::new(),
        }
    }

    /// Wire up a complete engine from configuration and collaborators
    pub fn from_config(
        config: &AggregatorConfig,
        transport: Arc<dyn Transport>,
        urls: Arc<dyn UrlBuilder>,
        scraper: Option<Arc<dyn MarketplaceScraper>>,
    ) -> AggregatorResult<Self> {
        config.validate()?;

        let mut client = ResilientClient::new(transport, urls, config.client_settings())?;
        if let Some(scraper) = scraper {
            client = client.with_scraper(scraper);
        }

        Ok(Self::new(
            Arc::new(client),
            config.worker_pools(),
            &config.orchestration,
        ))
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    pub fn checker(&self) -> &BatchMarketplaceChecker {
        &self.checker
    }

    pub fn pools(&self) -> &WorkerPools {
        &self.pools
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Cancel every physical query currently running on this orchestrator
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Run a batch, optionally excluding releases owned by `username`
    pub async fn process_batch(
        &self,
        queries: &[Query],
        username: Option<&str>,
        per_query_timeout: Duration,
    ) -> Vec<QueryResult> {
        let options = BatchOptions {
            username: username.map(str::to_string),
            per_query_timeout: Some(per_query_timeout),
            uk_marketplace_only: false,
        };
        self.process_batch_with_options(queries, &options).await
    }

    pub async fn process_batch_with_options(
        &self,
        queries: &[Query],
        options: &BatchOptions,
    ) -> Vec<QueryResult> {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let options = Arc::new(options.clone());
        let batch_cancel = self.shutdown.child_token();
        // Dropping the batch future cancels every task it spawned
        let _batch_guard = batch_cancel.clone().drop_guard();
        log_batch_operation(
            "process_batch",
            queries.len(),
            "started",
            None,
            Some(&batch_id),
        );

        let handles: Vec<_> = queries
            .iter()
            .cloned()
            .enumerate()
            .map(|(slot, query)| {
                let this = self.clone();
                let options = Arc::clone(&options);
                let cancel = batch_cancel.clone();
                let span = info_span!("query", batch_id = %batch_id, slot);
                tokio::spawn(
                    async move {
                        tokio::select! {
                            entries = this.process_query(query, &options, &cancel) => entries,
                            () = cancel.cancelled() => Vec::new(),
                        }
                    }
                    .instrument(span),
                )
            })
            .collect();

        let results: Vec<QueryResult> = join_all(handles)
            .await
            .into_iter()
            .zip(queries)
            .map(|(joined, query)| match joined {
                Ok(entries) => QueryResult::new(query.clone(), entries),
                Err(join_error) => {
                    log_error(
                        "orchestrator",
                        "process_query",
                        &join_error.to_string(),
                        Some(&query.to_string()),
                    );
                    QueryResult::failed(
                        query.clone(),
                        AggregatorError::unexpected("process_query", join_error.to_string()),
                    )
                }
            })
            .collect();

        log_batch_operation(
            "process_batch",
            queries.len(),
            "completed",
            Some(started.elapsed().as_millis() as u64),
            Some(&batch_id),
        );
        results
    }

    /// Validating entry point: invalid queries get a failed slot and are never searched
    pub async fn submit(&self, queries: &[Query], options: &BatchOptions) -> Vec<QueryResult> {
        let mut slots: Vec<Option<QueryResult>> = Vec::with_capacity(queries.len());
        let mut valid = Vec::new();

        for query in queries {
            match validate_query(query) {
                Ok(()) => {
                    slots.push(None);
                    valid.push(query.clone());
                }
                Err(error) => {
                    warn!(query = %query, error = %error, "Rejecting invalid query");
                    slots.push(Some(QueryResult::failed(query.clone(), error)));
                }
            }
        }

        let mut processed = self
            .process_batch_with_options(&valid, options)
            .await
            .into_iter();

        slots
            .into_iter()
            .zip(queries)
            .map(|(slot, query)| {
                slot.or_else(|| processed.next())
                    .unwrap_or_else(|| QueryResult::new(query.clone(), Vec::new()))
            })
            .collect()
    }

    async fn process_query(
        &self,
        query: Query,
        options: &BatchOptions,
        batch_cancel: &CancellationToken,
    ) -> ResultSet {
        let per_query_timeout = options.per_query_timeout.unwrap_or(self.default_timeout);
        let physical = expand(&query, &self.vinyl_variants);
        let physical_count = physical.len();

        let handles: Vec<_> = physical
            .into_iter()
            .map(|physical| self.spawn_physical(physical, per_query_timeout, batch_cancel))
            .collect();

        let mut seen = HashSet::new();
        let mut merged: ResultSet = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(entries)) => {
                    merged.extend(entries.into_iter().filter(|entry| seen.insert(entry.id)));
                }
                Ok(Err(error)) => {
                    warn!(query = %query, error = %error, "Physical query contributed no entries");
                }
                Err(join_error) => {
                    log_error(
                        "orchestrator",
                        "physical_query",
                        &join_error.to_string(),
                        Some(&query.to_string()),
                    );
                }
            }
        }
        merged.sort_by(|a, b| price_key(a).total_cmp(&price_key(b)));

        if let Some(username) = options.username.as_deref() {
            merged = self.exclude_owned(merged, username).await;
        }

        if options.uk_marketplace_only {
            merged = self.checker.filter_by_availability(merged).await;
        }

        log_query_operation(
            "process_query",
            &query.to_string(),
            physical_count,
            merged.len(),
            "completed",
        );
        merged
    }

    fn spawn_physical(
        &self,
        physical: PhysicalQuery,
        per_query_timeout: Duration,
        batch_cancel: &CancellationToken,
    ) -> tokio::task::JoinHandle<AggregatorResult<ResultSet>> {
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = batch_cancel.child_token();

        tokio::spawn(async move {
            match timeout(per_query_timeout, pipeline.run(&physical, &cancel)).await {
                Ok(result) => result,
                Err(_) => {
                    cancel.cancel();
                    Err(AggregatorError::Timeout {
                        operation: physical.to_string(),
                        timeout_ms: per_query_timeout.as_millis() as u64,
                    })
                }
            }
        })
    }

    /// Drop entries already in the user's collection; a failed lookup keeps the entry
    async fn exclude_owned(&self, entries: ResultSet, username: &str) -> ResultSet {
        let checks = entries.iter().map(|entry| async move {
            match self
                .pools
                .general
                .run(self.client.owned_by_user(username, entry.id))
                .await
            {
                Ok(owned) => owned,
                Err(error) => {
                    debug!(release_id = entry.id, error = %error, "Collection lookup failed, keeping entry");
                    false
                }
            }
        });
        let owned = join_all(checks).await;

        let before = entries.len();
        let kept: ResultSet = entries
            .into_iter()
            .zip(owned)
            .filter_map(|(entry, owned)| (!owned).then_some(entry))
            .collect();

        info!(
            username = username,
            excluded = before - kept.len(),
            "Excluded releases already in collection"
        );
        kept
    }
}

fn price_key(entry: &CatalogEntry) -> f64 {
    entry.lowest_price.unwrap_or(f64::MAX)
}

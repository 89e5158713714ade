//! # Per-Query Search Pipeline
//!
//! Turns one physical query into a price-ranked result set:
//!
//! 1. search the catalog (barcode alone when one is given)
//! 2. for compilations without an album, merge a phrase search by release id
//! 3. make every display URI absolute
//! 4. keep entries whose release matches the query's artist and track
//! 5. enrich survivors with marketplace quotes
//! 6. drop unpriced entries and sort by ascending price
//!
//! Steps run strictly in order. The cancellation token is checked before every
//! external call, and every call is raced against it.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ResilientClient;
use crate::error::{AggregatorError, AggregatorResult};
use crate::marketplace::BatchMarketplaceChecker;
use crate::models::{CatalogEntry, PhysicalQuery, Query, ResultSet};
use crate::orchestration::WorkerPools;
use crate::search::ReleaseMatcher;

#[derive(Debug, Clone)]
pub struct SearchPipeline {
    client: Arc<ResilientClient>,
    checker: Arc<BatchMarketplaceChecker>,
    pools: WorkerPools,
}

impl SearchPipeline {
    pub fn new(
        client: Arc<ResilientClient>,
        checker: Arc<BatchMarketplaceChecker>,
        pools: WorkerPools,
    ) -> Self {
        Self {
            client,
            checker,
            pools,
        }
    }

    /// Run every pipeline step for one physical query
    ///
    /// A failure of the primary search is returned to the caller. Failures
    /// while filtering or pricing a single entry only drop or leave that entry.
    pub async fn run(
        &self,
        physical: &PhysicalQuery,
        cancel: &CancellationToken,
    ) -> AggregatorResult<ResultSet> {
        let query = physical.query();
        debug!(query = %physical, "Running search pipeline");

        let mut entries = self.search(query, cancel).await?;
        let found = entries.len();

        self.correct_uris(&mut entries);

        let matched = self.filter_matching(query, entries, cancel).await?;
        let matched_count = matched.len();

        let mut priced = self.enrich_with_quotes(matched, cancel).await?;

        priced.retain(CatalogEntry::has_price);
        priced.sort_by(|a, b| price_of(a).total_cmp(&price_of(b)));

        info!(
            query = %physical,
            found,
            matched = matched_count,
            priced = priced.len(),
            "Search pipeline complete"
        );
        Ok(priced)
    }

    async fn search(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> AggregatorResult<Vec<CatalogEntry>> {
        let mut entries = guarded(
            cancel,
            "catalog_search",
            self.pools.catalog.run(self.client.search(query)),
        )
        .await?;

        if query.format_kind().is_compilation() && query.album().is_none() {
            let variant = guarded(
                cancel,
                "compilation_search",
                self.pools.catalog.run(self.client.compilation_search(query)),
            )
            .await;

            match variant {
                Ok(extra) => merge_by_id(&mut entries, extra),
                Err(error) if error.is_cancelled() => return Err(error),
                Err(error) => {
                    warn!(query = %query, error = %error, "Compilation search failed, keeping primary results");
                }
            }
        }

        Ok(entries)
    }

    fn correct_uris(&self, entries: &mut [CatalogEntry]) {
        let base = self.client.urls().site_base_url();
        for entry in entries {
            if let Some(uri) = entry.uri.as_mut() {
                if !uri.contains(base) {
                    let separator = if uri.starts_with('/') { "" } else { "/" };
                    *uri = format!("{base}{separator}{uri}");
                }
            }
        }
    }

    async fn filter_matching(
        &self,
        query: &Query,
        entries: Vec<CatalogEntry>,
        cancel: &CancellationToken,
    ) -> AggregatorResult<Vec<CatalogEntry>> {
        let matcher = ReleaseMatcher::for_query(query);
        let matcher = &matcher;

        let outcomes: Vec<_> = stream::iter(entries)
            .map(|entry| async move {
                let outcome = self.match_entry(&entry, matcher, cancel).await;
                (entry, outcome)
            })
            .buffered(self.pools.catalog.concurrency())
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(AggregatorError::Cancelled {
                operation: "release_filter".to_string(),
            });
        }

        Ok(outcomes
            .into_iter()
            .filter_map(|(mut entry, outcome)| match outcome {
                Ok(Some(price)) => {
                    entry.lowest_price = price;
                    Some(entry)
                }
                Ok(None) => None,
                Err(error) => {
                    debug!(release_id = entry.id, error = %error, "Dropping entry that failed to filter");
                    None
                }
            })
            .collect())
    }

    /// `Ok(Some(price))` when the release matches, carrying its lowest price
    async fn match_entry(
        &self,
        entry: &CatalogEntry,
        matcher: &ReleaseMatcher,
        cancel: &CancellationToken,
    ) -> AggregatorResult<Option<Option<f64>>> {
        let release = guarded(
            cancel,
            "release_detail",
            self.pools.catalog.run(self.client.release(entry.id)),
        )
        .await
        .map_err(|error| AggregatorError::EntryFilter {
            release_id: entry.id,
            message: error.to_string(),
        })?;

        Ok(matcher.matches(&release).then_some(release.lowest_price))
    }

    async fn enrich_with_quotes(
        &self,
        entries: Vec<CatalogEntry>,
        cancel: &CancellationToken,
    ) -> AggregatorResult<Vec<CatalogEntry>> {
        let enriched: Vec<CatalogEntry> = stream::iter(entries)
            .map(|mut entry| async move {
                self.apply_marketplace_quote(&mut entry, cancel).await;
                entry
            })
            .buffered(self.pools.marketplace.concurrency())
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(AggregatorError::Cancelled {
                operation: "marketplace_enrichment".to_string(),
            });
        }
        Ok(enriched)
    }

    /// Quote endpoint first, scraped listings second, release price otherwise
    async fn apply_marketplace_quote(&self, entry: &mut CatalogEntry, cancel: &CancellationToken) {
        let quote = guarded(
            cancel,
            "marketplace_quote",
            self.pools.marketplace.run(self.client.marketplace_quote(entry.id)),
        )
        .await;

        let quote = match quote {
            Ok(quote) => quote,
            Err(error) if error.is_cancelled() => return,
            Err(error) if self.client.has_scraper() => {
                debug!(release_id = entry.id, error = %error, "Quote unavailable, falling back to listings");
                match guarded(cancel, "listings_quote", self.checker.quote_from_listings(entry.id)).await {
                    Ok(quote) => quote,
                    Err(error) => {
                        debug!(release_id = entry.id, error = %error, "No marketplace quote, keeping release price");
                        return;
                    }
                }
            }
            Err(error) => {
                debug!(release_id = entry.id, error = %error, "No marketplace quote, keeping release price");
                return;
            }
        };

        entry.apply_quote(&quote);
    }
}

/// Run `operation` unless or until `cancel` fires
async fn guarded<T>(
    cancel: &CancellationToken,
    operation: &str,
    future: impl Future<Output = AggregatorResult<T>>,
) -> AggregatorResult<T> {
    let cancelled = || AggregatorError::Cancelled {
        operation: operation.to_string(),
    };

    if cancel.is_cancelled() {
        return Err(cancelled());
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled()),
        result = future => result,
    }
}

/// Append entries whose id is not already present
fn merge_by_id(entries: &mut Vec<CatalogEntry>, extra: Vec<CatalogEntry>) {
    let mut seen: HashSet<u64> = entries.iter().map(|entry| entry.id).collect();
    entries.extend(extra.into_iter().filter(|entry| seen.insert(entry.id)));
}

fn price_of(entry: &CatalogEntry) -> f64 {
    entry.lowest_price.unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_by_id_is_a_union() {
        let mut entries = vec![CatalogEntry::new(1, "A"), CatalogEntry::new(2, "B")];
        merge_by_id(
            &mut entries,
            vec![CatalogEntry::new(2, "B again"), CatalogEntry::new(3, "C")],
        );

        let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(entries[1].title, "B");
    }

    #[tokio::test]
    async fn test_guarded_short_circuits_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = guarded(&cancel, "search", async { Ok::<_, AggregatorError>(1) }).await;
        assert!(matches!(result, Err(AggregatorError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_guarded_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = guarded(&cancel, "search", async { Ok::<_, AggregatorError>(1) }).await;
        assert_eq!(result, Ok(1));
    }
}

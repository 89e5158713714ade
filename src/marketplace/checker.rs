//! # Batch Marketplace Checker
//!
//! Checks UK marketplace availability for many entries at once. Release ids
//! are deduplicated first, so a release that appears under several format
//! variants is looked up once, and lookups run concurrently on the
//! marketplace pool.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::ResilientClient;
use crate::error::AggregatorResult;
use crate::models::{CatalogEntry, Listing, MarketplaceQuote, Price};
use crate::orchestration::WorkerPool;

#[derive(Debug, Clone)]
pub struct BatchMarketplaceChecker {
    client: Arc<ResilientClient>,
    pool: Arc<WorkerPool>,
    /// Lowercased shipping origins that count as UK
    uk_countries: Vec<String>,
}

impl BatchMarketplaceChecker {
    pub fn new(
        client: Arc<ResilientClient>,
        pool: Arc<WorkerPool>,
        uk_shipping_countries: &[String],
    ) -> Self {
        Self {
            client,
            pool,
            uk_countries: uk_shipping_countries
                .iter()
                .map(|country| country.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn ships_from_uk(&self, listing: &Listing) -> bool {
        let country = listing.shipping_country.trim().to_lowercase();
        self.uk_countries.contains(&country)
    }

    /// UK-shipping listings for one release
    pub async fn uk_listings(&self, release_id: u64) -> AggregatorResult<Vec<Listing>> {
        let listings = self
            .pool
            .run(self.client.listings(release_id))
            .await?;
        Ok(listings
            .into_iter()
            .filter(|listing| self.ships_from_uk(listing))
            .collect())
    }

    /// Ids among `entries` that have at least one UK-shipping listing
    ///
    /// A failed lookup excludes its id; it never fails the batch.
    pub async fn check_availability(&self, entries: &[CatalogEntry]) -> HashSet<u64> {
        let mut seen = HashSet::new();
        let ids: Vec<u64> = entries
            .iter()
            .map(|entry| entry.id)
            .filter(|id| seen.insert(*id))
            .collect();

        debug!(
            entries = entries.len(),
            distinct_releases = ids.len(),
            "Checking marketplace availability"
        );

        let lookups = ids.iter().map(|&release_id| async move {
            match self.uk_listings(release_id).await {
                Ok(listings) => (!listings.is_empty()).then_some(release_id),
                Err(error) => {
                    warn!(release_id, error = %error, "Marketplace lookup failed, treating as unavailable");
                    None
                }
            }
        });

        let available: HashSet<u64> = join_all(lookups).await.into_iter().flatten().collect();

        info!(
            distinct_releases = ids.len(),
            available = available.len(),
            "Marketplace availability check complete"
        );
        available
    }

    /// Keep only entries available on the UK marketplace, marking them as such
    pub async fn filter_by_availability(&self, entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
        let available = self.check_availability(&entries).await;
        entries
            .into_iter()
            .filter(|entry| available.contains(&entry.id))
            .map(|mut entry| {
                entry.is_on_marketplace = Some(true);
                entry
            })
            .collect()
    }

    /// Quote built from scraped UK listings: cheapest price and listing count
    pub async fn quote_from_listings(&self, release_id: u64) -> AggregatorResult<MarketplaceQuote> {
        let listings = self.uk_listings(release_id).await?;
        Ok(quote_for(&listings))
    }
}

fn quote_for(listings: &[Listing]) -> MarketplaceQuote {
    let cheapest = listings
        .iter()
        .map(|listing| &listing.price)
        .min_by(|a, b| a.value.total_cmp(&b.value));

    MarketplaceQuote {
        lowest_price: cheapest.map(|price| Price {
            currency: price.currency.clone(),
            value: price.value,
        }),
        num_for_sale: Some(u32::try_from(listings.len()).unwrap_or(u32::MAX)),
    }
}

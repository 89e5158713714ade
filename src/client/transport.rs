//! Collaborator contracts the engine is implemented against.
//!
//! Everything that leaves the process goes through one of these traits, so
//! tests substitute in-memory fakes and production wires in
//! [`crate::client::HttpTransport`] plus whatever scraper the deployment has.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::TransportError;
use crate::models::{Listing, Query};

/// Raw HTTP access to the catalog API
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// GET a JSON body, failing on non-2xx status or network failure
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, TransportError>;

    /// GET a body as text, failing on non-2xx status or network failure
    async fn get_string(&self, url: &str) -> Result<String, TransportError>;
}

/// Marketplace listings for one release, typically scraped from the marketplace page
#[async_trait]
pub trait MarketplaceScraper: Send + Sync + Debug {
    async fn listings_for_release(&self, release_id: u64) -> Result<Vec<Listing>, TransportError>;
}

/// Ownership check against a user's catalog collection
#[async_trait]
pub trait CollectionLookup: Send + Sync + Debug {
    async fn release_owned_by_user(
        &self,
        username: &str,
        release_id: u64,
    ) -> Result<bool, TransportError>;
}

/// Produces the concrete URLs for every outbound call type
///
/// Tokens, pagination and parameter naming are configuration concerns owned by
/// the implementation.
pub trait UrlBuilder: Send + Sync + Debug {
    fn search_url(&self, query: &Query) -> String;

    /// Compilation variant: artist and track searched together as one phrase
    fn compilation_search_url(&self, query: &Query) -> String;

    fn release_url(&self, release_id: u64) -> String;

    fn marketplace_quote_url(&self, release_id: u64) -> String;

    fn collection_url(&self, username: &str, release_id: u64) -> String;

    /// Public marketplace page listing copies of a release, consumed by scrapers
    fn marketplace_listings_url(&self, release_id: u64) -> String;

    /// Public site base used to build absolute display URIs
    fn site_base_url(&self) -> &str;
}

//! Marketplace availability and price lookups layered on the resilient client.

pub mod checker;
pub mod listings;

pub use checker::BatchMarketplaceChecker;
pub use listings::{
    HtmlListingsParser, ListingSelectors, ListingsPageParser, TransportMarketplaceScraper,
};

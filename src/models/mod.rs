//! # Data Model
//!
//! Value types flowing through the engine: user queries and their physical
//! expansions, catalog entries and the release/marketplace data used to enrich
//! them, and the per-query result shapes handed back to callers.

pub mod entry;
pub mod query;
pub mod results;

pub use entry::{
    ArtistCredit, CatalogEntry, Listing, MarketplaceQuote, Price, ReleaseDetail, Track,
};
pub use query::{Format, PhysicalQuery, Query};
pub use results::{GroupedResult, QueryResult, ResultSet};

//! # Catalog Client
//!
//! Outbound access to the music catalog. The collaborator traits in
//! [`transport`] are the seam between the engine and the network;
//! [`ResilientClient`] wraps them with caching, circuit breaking, rate limiting
//! and retries so nothing above this module talks to a raw transport.

pub mod collection;
pub mod http;
pub mod resilient;
pub mod transport;
pub mod urls;
pub mod wire;

pub use collection::TransportCollectionLookup;
pub use http::HttpTransport;
pub use resilient::{CallKind, ClientSettings, ResilientClient};
pub use transport::{CollectionLookup, MarketplaceScraper, Transport, UrlBuilder};
pub use urls::CatalogUrlBuilder;

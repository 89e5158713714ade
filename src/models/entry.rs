//! Catalog entries and the release/marketplace data used to enrich them.

use serde::{Deserialize, Serialize};

/// One catalog search hit, enriched in place by the search pipeline
///
/// Identity is the numeric release id: dedup and set membership only look at `id`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub formats: Vec<String>,
    /// Canonical API resource URL
    pub resource_url: Option<String>,
    /// Display URI, corrected to an absolute site URL by the pipeline
    pub uri: Option<String>,
    pub country: Option<String>,
    pub year: Option<String>,
    pub lowest_price: Option<f64>,
    pub number_for_sale: Option<u32>,
    pub is_on_marketplace: Option<bool>,
}

impl CatalogEntry {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.lowest_price = price;
        self
    }

    /// True when the entry carries a usable, non-zero price
    pub fn has_price(&self) -> bool {
        matches!(self.lowest_price, Some(price) if price != 0.0)
    }

    /// Overwrite marketplace fields from a quote
    ///
    /// An empty quote leaves the entry untouched so the release-derived price survives.
    pub fn apply_quote(&mut self, quote: &MarketplaceQuote) {
        if quote.is_empty() {
            return;
        }
        if let Some(count) = quote.num_for_sale {
            self.number_for_sale = Some(count);
            self.is_on_marketplace = Some(count > 0);
        }
        if let Some(price) = &quote.lowest_price {
            self.lowest_price = Some(price.value);
        }
    }
}

/// Artist credit on a release or track
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub name: String,
    /// Artist name variation used on this release, if any
    #[serde(default)]
    pub anv: Option<String>,
}

impl ArtistCredit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            anv: None,
        }
    }

    /// All spellings this credit is known by on the release
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.anv.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    /// Per-track artist attribution, empty when the track inherits the release artists
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
}

impl Track {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artists: Vec::new(),
        }
    }

    pub fn with_artists(mut self, artists: Vec<ArtistCredit>) -> Self {
        self.artists = artists;
        self
    }
}

/// Full release detail, fetched lazily to decide whether an entry matches a query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReleaseDetail {
    pub id: u64,
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
    #[serde(default)]
    pub extra_artists: Vec<ArtistCredit>,
    #[serde(default)]
    pub tracklist: Vec<Track>,
    pub lowest_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub currency: String,
    pub value: f64,
}

/// Marketplace summary for one release
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketplaceQuote {
    pub lowest_price: Option<Price>,
    pub num_for_sale: Option<u32>,
}

impl MarketplaceQuote {
    /// The "no listings" quote
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lowest_price.is_none() && self.num_for_sale.is_none()
    }
}

/// One for-sale copy of a release, as produced by the marketplace scraper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub price: Price,
    pub condition: String,
    pub shipping_country: String,
    pub seller_name: String,
    pub seller_rating: Option<f64>,
    pub rating_count: Option<u32>,
}

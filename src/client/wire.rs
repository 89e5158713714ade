//! Catalog API response shapes and their mapping onto domain models.
//!
//! Only the fields the engine reads are declared; everything else in the
//! payload is ignored by serde.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::TransportError;
use crate::models::{ArtistCredit, CatalogEntry, MarketplaceQuote, Price, ReleaseDetail, Track};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    format: Vec<String>,
    resource_url: Option<String>,
    uri: Option<String>,
    country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    year: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: u64,
    #[serde(default)]
    artists: Vec<ArtistWire>,
    #[serde(default, rename = "extraartists")]
    extra_artists: Vec<ArtistWire>,
    #[serde(default)]
    tracklist: Vec<TrackWire>,
    lowest_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ArtistWire {
    #[serde(default)]
    name: String,
    anv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackWire {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artists: Vec<ArtistWire>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    lowest_price: Option<PriceWire>,
    num_for_sale: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PriceWire {
    #[serde(default)]
    currency: String,
    value: f64,
}

/// Years arrive as either strings or numbers depending on the endpoint
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl From<ArtistWire> for ArtistCredit {
    fn from(wire: ArtistWire) -> Self {
        ArtistCredit {
            name: wire.name,
            anv: wire.anv.filter(|anv| !anv.trim().is_empty()),
        }
    }
}

impl From<TrackWire> for Track {
    fn from(wire: TrackWire) -> Self {
        Track::new(wire.title).with_artists(wire.artists.into_iter().map(Into::into).collect())
    }
}

impl From<SearchHit> for CatalogEntry {
    fn from(hit: SearchHit) -> Self {
        CatalogEntry {
            id: hit.id,
            title: hit.title,
            formats: hit.format,
            resource_url: hit.resource_url,
            uri: hit.uri,
            country: hit.country,
            year: hit.year,
            ..Default::default()
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: serde_json::Value) -> Result<T, TransportError> {
    serde_json::from_value(body).map_err(|e| TransportError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

pub fn decode_search(url: &str, body: serde_json::Value) -> Result<Vec<CatalogEntry>, TransportError> {
    let response: SearchResponse = decode(url, body)?;
    Ok(response.results.into_iter().map(Into::into).collect())
}

pub fn decode_release(url: &str, body: serde_json::Value) -> Result<ReleaseDetail, TransportError> {
    let release: ReleaseResponse = decode(url, body)?;
    Ok(ReleaseDetail {
        id: release.id,
        artists: release.artists.into_iter().map(Into::into).collect(),
        extra_artists: release.extra_artists.into_iter().map(Into::into).collect(),
        tracklist: release.tracklist.into_iter().map(Into::into).collect(),
        lowest_price: release.lowest_price,
    })
}

pub fn decode_quote(url: &str, body: serde_json::Value) -> Result<MarketplaceQuote, TransportError> {
    let stats: StatsResponse = decode(url, body)?;
    Ok(MarketplaceQuote {
        lowest_price: stats.lowest_price.map(|p| Price {
            currency: p.currency,
            value: p.value,
        }),
        num_for_sale: stats.num_for_sale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_search_results() {
        let body = json!({
            "pagination": {"page": 1, "pages": 1},
            "results": [
                {
                    "id": 1,
                    "title": "Burial - Untrue",
                    "format": ["Vinyl", "LP", "Album"],
                    "uri": "/release/1-Burial-Untrue",
                    "resource_url": "https://api.discogs.com/releases/1",
                    "country": "UK",
                    "year": "2007",
                    "style": ["Dubstep"]
                },
                {"id": 2, "title": "Burial - Untrue", "year": 2008}
            ]
        });

        let entries = decode_search("u", body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].formats, vec!["Vinyl", "LP", "Album"]);
        assert_eq!(entries[0].uri.as_deref(), Some("/release/1-Burial-Untrue"));
        assert_eq!(entries[1].year.as_deref(), Some("2008"));
        assert_eq!(entries[1].lowest_price, None);
    }

    #[test]
    fn test_decode_release_blank_anv_is_none() {
        let body = json!({
            "id": 7,
            "artists": [{"name": "The Beatles", "anv": ""}],
            "extraartists": [{"name": "George Martin", "anv": "G. Martin"}],
            "tracklist": [
                {"title": "Help!", "artists": []},
                {"title": "Yesterday"}
            ],
            "lowest_price": 9.99
        });

        let release = decode_release("u", body).unwrap();
        assert_eq!(release.artists[0].anv, None);
        assert_eq!(release.extra_artists[0].anv.as_deref(), Some("G. Martin"));
        assert_eq!(release.tracklist.len(), 2);
        assert_eq!(release.lowest_price, Some(9.99));
    }

    #[test]
    fn test_decode_quote_without_listings() {
        let quote = decode_quote(
            "u",
            json!({"lowest_price": null, "num_for_sale": 0, "blocked_from_sale": false}),
        )
        .unwrap();
        assert_eq!(quote.lowest_price, None);
        assert_eq!(quote.num_for_sale, Some(0));
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let result = decode_release("https://api/releases/x", json!({"id": "nope"}));
        assert!(matches!(result, Err(TransportError::Decode { .. })));
    }
}

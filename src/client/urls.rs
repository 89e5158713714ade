//! Discogs-style URL construction for every call type the engine makes.

use reqwest::Url;
use tracing::warn;

use crate::client::UrlBuilder;
use crate::config::CatalogApiConfig;
use crate::constants::{catalog, formats};
use crate::error::{AggregatorError, AggregatorResult};
use crate::models::Query;

#[derive(Debug, Clone)]
pub struct CatalogUrlBuilder {
    api_base: Url,
    site_base: String,
    token: Option<String>,
    per_page: u32,
    currency: String,
}

impl CatalogUrlBuilder {
    pub fn new(config: &CatalogApiConfig) -> AggregatorResult<Self> {
        let api_base = Url::parse(&config.api_base_url).map_err(|e| {
            AggregatorError::Configuration(format!(
                "Invalid api_base_url {}: {e}",
                config.api_base_url
            ))
        })?;

        if api_base.cannot_be_a_base() {
            return Err(AggregatorError::Configuration(format!(
                "api_base_url {} cannot be used as a base URL",
                config.api_base_url
            )));
        }

        Ok(Self {
            api_base,
            site_base: config.site_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            per_page: config.per_page,
            currency: config.marketplace_currency.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        match url.path_segments_mut() {
            Ok(mut path) => {
                path.pop_if_empty().extend(segments);
            }
            Err(()) => warn!(base = %self.api_base, "API base URL rejected path segments"),
        }
        url
    }

    fn finish(&self, mut url: Url) -> String {
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        url.into()
    }

    fn search_endpoint(&self, catalog_type: Option<&str>) -> Url {
        let mut url = self.endpoint(&["database", "search"]);
        {
            let mut params = url.query_pairs_mut();
            params.append_pair(
                "type",
                catalog_type
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(catalog::DEFAULT_CATALOG_TYPE),
            );
            params.append_pair("per_page", &self.per_page.to_string());
        }
        url
    }
}

impl UrlBuilder for CatalogUrlBuilder {
    fn search_url(&self, query: &Query) -> String {
        // A barcode identifies the release on its own
        if let Some(barcode) = query.barcode() {
            let mut url = self.search_endpoint(None);
            url.query_pairs_mut().append_pair("barcode", barcode);
            return self.finish(url);
        }

        let mut url = self.search_endpoint(query.catalog_type.as_deref());
        {
            let mut params = url.query_pairs_mut();
            let format = query.format_kind();
            let fields = [
                ("artist", query.artist()),
                ("release_title", query.album()),
                ("track", query.track()),
                ("q", query.title()),
                ("format", format.search_value()),
                ("country", query.country.as_deref().map(str::trim).filter(|c| !c.is_empty())),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    params.append_pair(name, value);
                }
            }
        }
        self.finish(url)
    }

    fn compilation_search_url(&self, query: &Query) -> String {
        let phrase = [query.artist(), query.track()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let mut url = self.search_endpoint(query.catalog_type.as_deref());
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("q", &phrase);
            params.append_pair("format", formats::COMPILATION);
            if let Some(country) = query.country.as_deref().map(str::trim).filter(|c| !c.is_empty())
            {
                params.append_pair("country", country);
            }
        }
        self.finish(url)
    }

    fn release_url(&self, release_id: u64) -> String {
        let mut url = self.endpoint(&["releases", &release_id.to_string()]);
        url.query_pairs_mut().append_pair("curr_abbr", &self.currency);
        self.finish(url)
    }

    fn marketplace_quote_url(&self, release_id: u64) -> String {
        let mut url = self.endpoint(&["marketplace", "stats", &release_id.to_string()]);
        url.query_pairs_mut().append_pair("curr_abbr", &self.currency);
        self.finish(url)
    }

    fn collection_url(&self, username: &str, release_id: u64) -> String {
        let url = self.endpoint(&[
            "users",
            username,
            "collection",
            "releases",
            &release_id.to_string(),
        ]);
        self.finish(url)
    }

    fn marketplace_listings_url(&self, release_id: u64) -> String {
        format!(
            "{}/sell/release/{release_id}?currency={}",
            self.site_base, self.currency
        )
    }

    fn site_base_url(&self) -> &str {
        &self.site_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(token: Option<&str>) -> CatalogUrlBuilder {
        CatalogUrlBuilder::new(&CatalogApiConfig {
            token: token.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_barcode_is_used_exclusively() {
        let query = Query {
            artist: Some("Burial".to_string()),
            album: Some("Untrue".to_string()),
            barcode: Some("5055869540123".to_string()),
            ..Default::default()
        };

        let url = builder(None).search_url(&query);
        assert!(url.contains("barcode=5055869540123"));
        assert!(!url.contains("artist="));
        assert!(!url.contains("release_title="));
    }

    #[test]
    fn test_barcode_search_ignores_catalog_type() {
        let query = Query {
            artist: Some("Burial".to_string()),
            barcode: Some("5021392584623".to_string()),
            catalog_type: Some("master".to_string()),
            ..Default::default()
        };

        let url = builder(None).search_url(&query);
        assert_eq!(
            url,
            "https://api.discogs.com/database/search?type=release&per_page=100&barcode=5021392584623"
        );
    }

    #[test]
    fn test_search_url_maps_fields() {
        let query = Query {
            artist: Some("Simon and Garfunkel".to_string()),
            album: Some("Bookends".to_string()),
            format: Some("LP".to_string()),
            country: Some("UK".to_string()),
            ..Default::default()
        };

        let url = builder(Some("secret")).search_url(&query);
        assert!(url.starts_with("https://api.discogs.com/database/search?"));
        assert!(url.contains("type=release"));
        assert!(url.contains("artist=Simon+and+Garfunkel"));
        assert!(url.contains("release_title=Bookends"));
        assert!(url.contains("format=LP"));
        assert!(url.contains("country=UK"));
        assert!(url.ends_with("token=secret"));
    }

    #[test]
    fn test_compilation_url_uses_phrase() {
        let query = Query {
            artist: Some("Aphex Twin".to_string()),
            track: Some("Windowlicker".to_string()),
            format: Some("Compilation".to_string()),
            ..Default::default()
        };

        let url = builder(None).compilation_search_url(&query);
        assert!(url.contains("q=Aphex+Twin+Windowlicker"));
        assert!(url.contains("format=Compilation"));
        assert!(!url.contains("artist="));
    }

    #[test]
    fn test_collection_url_encodes_username() {
        let url = builder(None).collection_url("dj name", 42);
        assert_eq!(
            url,
            "https://api.discogs.com/users/dj%20name/collection/releases/42"
        );
    }

    #[test]
    fn test_listings_url_uses_site_base() {
        assert_eq!(
            builder(Some("secret")).marketplace_listings_url(9),
            "https://www.discogs.com/sell/release/9?currency=GBP"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        let result = CatalogUrlBuilder::new(&CatalogApiConfig {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(AggregatorError::Configuration(_))));
    }
}

//! Shared fakes and builders for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate_digger::client::{
    CatalogUrlBuilder, ClientSettings, MarketplaceScraper, ResilientClient, Transport,
};
use crate_digger::config::{AggregatorConfig, CatalogApiConfig, OrchestrationSettings};
use crate_digger::error::TransportError;
use crate_digger::models::{Listing, Price};
use crate_digger::orchestration::{QueryOrchestrator, WorkerPools};
use crate_digger::resilience::{CircuitBreakerConfig, RateLimiterConfig, RetryConfig};

pub const API_BASE: &str = "https://api.test";
pub const SITE_BASE: &str = "https://www.test";

/// Canned reply for URLs containing a pattern
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Delayed(Duration, Value),
    /// Plain-text body, only served to `get_string`
    Text(String),
}

/// In-memory [`Transport`]: the first route whose pattern occurs in the URL answers
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: &str, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((pattern.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    fn reply_for(&self, url: &str) -> Option<Reply> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());

        match self.reply_for(url) {
            Some(Reply::Json(body)) => Ok(body),
            Some(Reply::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(Reply::Status(status)) => Err(TransportError::Status {
                status,
                url: url.to_string(),
            }),
            Some(Reply::Text(_)) => Err(TransportError::Decode {
                url: url.to_string(),
                message: "expected JSON".to_string(),
            }),
            None => Err(TransportError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn get_string(&self, url: &str) -> Result<String, TransportError> {
        if let Some(Reply::Text(body)) = self.reply_for(url) {
            self.calls.lock().unwrap().push(url.to_string());
            return Ok(body);
        }
        self.get_json(url).await.map(|body| body.to_string())
    }
}

/// In-memory [`MarketplaceScraper`] that counts lookups per release
#[derive(Debug, Default)]
pub struct FakeScraper {
    listings: HashMap<u64, Result<Vec<Listing>, TransportError>>,
    lookups: Mutex<HashMap<u64, u32>>,
}

impl FakeScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(mut self, release_id: u64, listings: Vec<Listing>) -> Self {
        self.listings.insert(release_id, Ok(listings));
        self
    }

    pub fn failing(mut self, release_id: u64) -> Self {
        self.listings.insert(
            release_id,
            Err(TransportError::Network {
                url: format!("{SITE_BASE}/sell/release/{release_id}"),
                message: "connection reset".to_string(),
            }),
        );
        self
    }

    pub fn lookups_for(&self, release_id: u64) -> u32 {
        self.lookups
            .lock()
            .unwrap()
            .get(&release_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl MarketplaceScraper for FakeScraper {
    async fn listings_for_release(&self, release_id: u64) -> Result<Vec<Listing>, TransportError> {
        *self.lookups.lock().unwrap().entry(release_id).or_default() += 1;
        self.listings
            .get(&release_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn listing(value: f64, shipping_country: &str) -> Listing {
    Listing {
        price: Price {
            currency: "GBP".to_string(),
            value,
        },
        condition: "Near Mint (NM or M-)".to_string(),
        shipping_country: shipping_country.to_string(),
        seller_name: "record-shop".to_string(),
        seller_rating: Some(99.8),
        rating_count: Some(1520),
    }
}

pub fn catalog_config() -> CatalogApiConfig {
    CatalogApiConfig {
        api_base_url: API_BASE.to_string(),
        site_base_url: SITE_BASE.to_string(),
        ..Default::default()
    }
}

/// Settings with millisecond retry delays and a limiter that never throttles tests
pub fn fast_settings() -> ClientSettings {
    ClientSettings {
        circuit_breaker: CircuitBreakerConfig::default(),
        rate_limiter: RateLimiterConfig {
            requests_per_minute: 60_000,
            burst: 10_000,
            poll_interval: Duration::from_millis(1),
        },
        retry: RetryConfig {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1),
            rate_limit_cooldown: Duration::from_millis(5),
        },
        cache: Default::default(),
    }
}

pub fn client_with(transport: Arc<FakeTransport>, settings: ClientSettings) -> ResilientClient {
    let urls = CatalogUrlBuilder::new(&catalog_config()).unwrap();
    ResilientClient::new(transport, Arc::new(urls), settings).unwrap()
}

pub fn client(transport: Arc<FakeTransport>) -> ResilientClient {
    client_with(transport, fast_settings())
}

pub fn orchestration_settings(per_query_timeout_ms: u64) -> OrchestrationSettings {
    OrchestrationSettings {
        per_query_timeout_ms,
        vinyl_variants: vec!["Vinyl".to_string(), "LP".to_string()],
        ..Default::default()
    }
}

pub fn orchestrator(
    transport: Arc<FakeTransport>,
    scraper: Option<Arc<FakeScraper>>,
    per_query_timeout_ms: u64,
) -> QueryOrchestrator {
    let mut client = client(transport);
    if let Some(scraper) = scraper {
        client = client.with_scraper(scraper);
    }
    QueryOrchestrator::new(
        Arc::new(client),
        AggregatorConfig::default().worker_pools(),
        &orchestration_settings(per_query_timeout_ms),
    )
}

pub fn pools() -> WorkerPools {
    WorkerPools::default()
}

pub fn search_body(hits: &[(u64, &str)]) -> Value {
    let results: Vec<Value> = hits
        .iter()
        .map(|(id, title)| {
            json!({
                "id": id,
                "title": title,
                "format": ["Vinyl", "LP"],
                "uri": format!("/release/{id}"),
                "resource_url": format!("{API_BASE}/releases/{id}"),
                "country": "UK",
                "year": "2007"
            })
        })
        .collect();
    json!({ "pagination": { "page": 1, "pages": 1 }, "results": results })
}

pub fn release_body(id: u64, artist: &str, tracks: &[&str], lowest_price: Option<f64>) -> Value {
    let tracklist: Vec<Value> = tracks.iter().map(|t| json!({ "title": t })).collect();
    json!({
        "id": id,
        "artists": [{ "name": artist, "anv": "" }],
        "extraartists": [],
        "tracklist": tracklist,
        "lowest_price": lowest_price
    })
}

pub fn quote_body(price: Option<f64>, num_for_sale: u32) -> Value {
    match price {
        Some(value) => json!({
            "lowest_price": { "currency": "GBP", "value": value },
            "num_for_sale": num_for_sale
        }),
        None => json!({ "lowest_price": null, "num_for_sale": num_for_sale }),
    }
}

/// Route pattern for one release's detail endpoint
pub fn release_route(id: u64) -> String {
    format!("/releases/{id}?")
}

/// Route pattern for one release's marketplace stats endpoint
pub fn quote_route(id: u64) -> String {
    format!("/marketplace/stats/{id}?")
}

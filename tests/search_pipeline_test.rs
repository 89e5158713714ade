//! Integration tests for the per-query search pipeline

mod common;

use common::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate_digger::error::AggregatorError;
use crate_digger::marketplace::BatchMarketplaceChecker;
use crate_digger::models::{PhysicalQuery, Query};
use crate_digger::search::SearchPipeline;

fn pipeline(transport: Arc<FakeTransport>, scraper: Option<Arc<FakeScraper>>) -> SearchPipeline {
    let mut client = client(transport);
    if let Some(scraper) = scraper {
        client = client.with_scraper(scraper);
    }
    let client = Arc::new(client);
    let pools = pools();
    let checker = Arc::new(BatchMarketplaceChecker::new(
        Arc::clone(&client),
        Arc::clone(&pools.marketplace),
        &["United Kingdom".to_string()],
    ));
    SearchPipeline::new(client, checker, pools)
}

fn physical(artist: &str, track: Option<&str>, format: Option<&str>) -> PhysicalQuery {
    PhysicalQuery::new(Query {
        artist: Some(artist.to_string()),
        track: track.map(str::to_string),
        format: format.map(str::to_string),
        ..Default::default()
    })
}

fn ids(entries: &[crate_digger::CatalogEntry]) -> Vec<u64> {
    entries.iter().map(|e| e.id).collect()
}

#[tokio::test]
async fn test_prices_filter_and_sort() {
    let transport = Arc::new(
        FakeTransport::new()
            .route(
                "/database/search",
                Reply::Json(search_body(&[(1, "A"), (2, "B"), (3, "C"), (4, "D"), (5, "E")])),
            )
            .route(&release_route(1), Reply::Json(release_body(1, "Burial", &[], Some(30.0))))
            .route(&release_route(2), Reply::Json(release_body(2, "Burial", &[], Some(12.0))))
            .route(&release_route(3), Reply::Json(release_body(3, "Burial", &[], Some(8.0))))
            .route(&release_route(4), Reply::Json(release_body(4, "Burial", &[], Some(20.0))))
            .route(&release_route(5), Reply::Json(release_body(5, "Burial", &[], None)))
            // Marketplace price overwrites the release price
            .route(&quote_route(1), Reply::Json(quote_body(Some(10.0), 4)))
            // No listings: the release price survives
            .route(&quote_route(2), Reply::Json(quote_body(None, 0)))
            // A zero price is dropped
            .route(&quote_route(3), Reply::Json(quote_body(Some(0.0), 1)))
            .route(&quote_route(4), Reply::Json(quote_body(Some(5.0), 2)))
            .route(&quote_route(5), Reply::Json(quote_body(None, 0))),
    );
    let pipeline = pipeline(transport, None);

    let entries = pipeline
        .run(&physical("Burial", None, None), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&entries), vec![4, 1, 2]);
    let prices: Vec<f64> = entries.iter().filter_map(|e| e.lowest_price).collect();
    assert_eq!(prices, vec![5.0, 10.0, 12.0]);
    assert_eq!(entries[0].number_for_sale, Some(2));
    assert_eq!(entries[2].is_on_marketplace, Some(false));
    assert!(entries.windows(2).all(|w| w[0].lowest_price <= w[1].lowest_price));
}

#[tokio::test]
async fn test_uris_are_made_absolute() {
    let transport = Arc::new(
        FakeTransport::new()
            .route("/database/search", Reply::Json(search_body(&[(1, "A")])))
            .route("/releases/", Reply::Json(release_body(1, "Burial", &[], Some(9.0))))
            .route("/marketplace/stats/", Reply::Json(quote_body(None, 0))),
    );
    let entries = pipeline(transport, None)
        .run(&physical("Burial", None, None), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entries[0].uri.as_deref(), Some("https://www.test/release/1"));
}

#[tokio::test]
async fn test_non_matching_and_failing_entries_are_dropped() {
    let transport = Arc::new(
        FakeTransport::new()
            .route("/database/search", Reply::Json(search_body(&[(1, "A"), (2, "B"), (3, "C")])))
            .route(&release_route(1), Reply::Json(release_body(1, "Burial", &["Archangel"], Some(9.0))))
            .route(&release_route(2), Reply::Status(500))
            .route(&release_route(3), Reply::Json(release_body(3, "Someone Else", &["Archangel"], Some(4.0)))),
    );
    let entries = pipeline(transport, None)
        .run(&physical("Burial", Some("Archangel"), None), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&entries), vec![1]);
}

#[tokio::test]
async fn test_compilation_results_are_merged_by_id() {
    let transport = Arc::new(
        FakeTransport::new()
            // The phrase search is the only one carrying q=
            .route("q=Various", Reply::Json(search_body(&[(2, "Comp 2"), (3, "Comp 3")])))
            .route("/database/search", Reply::Json(search_body(&[(1, "Comp 1"), (2, "Comp 2")])))
            .route("/releases/", Reply::Json(release_body(0, "Various", &["Windowlicker"], Some(6.0))))
            .route("/marketplace/stats/", Reply::Json(quote_body(None, 0))),
    );
    let transport_ref = Arc::clone(&transport);
    let entries = pipeline(transport, None)
        .run(
            &physical("Various", Some("Windowlicker"), Some("Compilation")),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let mut found = ids(&entries);
    found.sort();
    assert_eq!(found, vec![1, 2, 3]);
    assert_eq!(transport_ref.calls_matching("/database/search"), 2);
    // Release 2 came back from both searches but is fetched once
    assert_eq!(transport_ref.calls_matching(&release_route(2)), 1);
}

#[tokio::test]
async fn test_compilation_with_album_skips_phrase_search() {
    let transport = Arc::new(
        FakeTransport::new()
            .route("q=Various", Reply::Json(search_body(&[(9, "Phrase Hit")])))
            .route("/database/search", Reply::Json(search_body(&[(1, "Comp 1")])))
            .route("/releases/", Reply::Json(release_body(0, "Various", &["Windowlicker"], Some(6.0))))
            .route("/marketplace/stats/", Reply::Json(quote_body(None, 0))),
    );
    let transport_ref = Arc::clone(&transport);
    let query = PhysicalQuery::new(Query {
        artist: Some("Various".to_string()),
        album: Some("Warp 10".to_string()),
        track: Some("Windowlicker".to_string()),
        format: Some("Compilation".to_string()),
        ..Default::default()
    });

    let entries = pipeline(transport, None)
        .run(&query, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&entries), vec![1]);
    assert_eq!(transport_ref.calls_matching("/database/search"), 1);
    assert_eq!(transport_ref.calls_matching("q=Various"), 0);
}

#[tokio::test]
async fn test_quote_falls_back_to_uk_listings() {
    let transport = Arc::new(
        FakeTransport::new()
            .route("/database/search", Reply::Json(search_body(&[(1, "A")])))
            .route("/releases/", Reply::Json(release_body(1, "Burial", &[], Some(30.0))))
            .route("/marketplace/stats/", Reply::Status(500)),
    );
    let scraper = Arc::new(FakeScraper::new().with_listings(
        1,
        vec![listing(14.0, "United Kingdom"), listing(3.0, "Germany"), listing(11.0, "United Kingdom")],
    ));

    let entries = pipeline(transport, Some(scraper))
        .run(&physical("Burial", None, None), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entries[0].lowest_price, Some(11.0));
    assert_eq!(entries[0].number_for_sale, Some(2));
}

#[tokio::test]
async fn test_search_failure_surfaces() {
    let transport = Arc::new(FakeTransport::new().route("/database/search", Reply::Status(500)));
    let result = pipeline(transport, None)
        .run(&physical("Burial", None, None), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AggregatorError::Search { .. })));
}

#[tokio::test]
async fn test_cancelled_token_stops_before_any_call() {
    let transport = Arc::new(
        FakeTransport::new().route("/database/search", Reply::Json(search_body(&[(1, "A")]))),
    );
    let transport_ref = Arc::clone(&transport);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline(transport, None)
        .run(&physical("Burial", None, None), &cancel)
        .await;

    assert!(matches!(result, Err(AggregatorError::Cancelled { .. })));
    assert!(transport_ref.calls().is_empty());
}

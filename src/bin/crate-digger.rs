//! # Crate Digger
//!
//! Runs a batch of queries read from a JSON file against the live catalog API
//! and prints the grouped results as JSON.
//!
//! ```text
//! crate-digger queries.json --username someone --uk-only
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use crate_digger::client::{CatalogUrlBuilder, HttpTransport};
use crate_digger::config::ConfigManager;
use crate_digger::logging::init_structured_logging;
use crate_digger::marketplace::{HtmlListingsParser, TransportMarketplaceScraper};
use crate_digger::models::Query;
use crate_digger::orchestration::{BatchOptions, QueryOrchestrator};
use crate_digger::{aggregation, QueryResult};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "crate-digger")]
#[command(about = "Search the music catalog for a batch of queries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// JSON file holding an array of queries
    queries: PathBuf,

    /// Configuration file path (default: config/crate-digger.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Exclude releases already in this user's collection
    #[arg(short, long)]
    username: Option<String>,

    /// Per physical query timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Only keep releases with a UK-shipping marketplace listing
    #[arg(long)]
    uk_only: bool,

    /// Print ungrouped result sets instead of grouped ones
    #[arg(long)]
    raw: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Output<'a> {
    Raw(&'a [QueryResult]),
    Grouped(Vec<crate_digger::GroupedResult>),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let config = ConfigManager::load(cli.config.as_deref())?.into_config();

    let body = std::fs::read_to_string(&cli.queries)
        .with_context(|| format!("reading {}", cli.queries.display()))?;
    let queries: Vec<Query> = serde_json::from_str(&body)
        .with_context(|| format!("parsing queries from {}", cli.queries.display()))?;

    let transport = Arc::new(HttpTransport::new(&config.catalog)?);
    let urls = Arc::new(CatalogUrlBuilder::new(&config.catalog)?);
    let parser = Arc::new(HtmlListingsParser::new(&config.catalog.listing_selectors)?);
    let scraper = Arc::new(TransportMarketplaceScraper::new(
        transport.clone(),
        urls.clone(),
        parser,
    ));
    let orchestrator = QueryOrchestrator::from_config(&config, transport, urls, Some(scraper))?;

    let options = BatchOptions {
        username: cli.username.clone(),
        per_query_timeout: cli.timeout_ms.map(Duration::from_millis),
        uk_marketplace_only: cli.uk_only,
    };

    info!(queries = queries.len(), "Submitting batch");
    let results = orchestrator.submit(&queries, &options).await;

    let output = if cli.raw {
        Output::Raw(&results)
    } else {
        Output::Grouped(aggregation::group_all(&results))
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    let metrics = orchestrator.client().breaker_metrics();
    info!(summary = %metrics.format_summary(), "Circuit breaker state at exit");
    Ok(())
}

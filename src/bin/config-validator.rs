//! # Crate Digger Configuration Validator
//!
//! Command-line tool for validating Crate Digger configuration files before
//! running a batch. Helps identify configuration issues before any request
//! reaches the catalog API.

use clap::{Parser, Subcommand};
use crate_digger::client::CatalogUrlBuilder;
use crate_digger::config::{AggregatorConfig, ConfigManager};
use crate_digger::marketplace::HtmlListingsParser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate Crate Digger configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file path (default: config/crate-digger.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate all configuration components
    All,

    /// Validate specific configuration component
    Component {
        /// Component name (catalog, rate_limiter, retry, circuit_breaker, cache, pools, orchestration)
        name: String,
    },

    /// Show the effective configuration with secrets redacted
    Show,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Show) => show_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<ConfigManager, Box<dyn std::error::Error>> {
    match ConfigManager::load(cli.config.as_deref()) {
        Ok(manager) => {
            match manager.source_file() {
                Some(path) => println!("✅ Configuration loaded from {}", path.display()),
                None => println!("✅ Configuration loaded from defaults and environment"),
            }
            Ok(manager)
        }
        Err(e) => {
            println!("❌ Failed to load configuration: {e}");
            Err(Box::new(e))
        }
    }
}

fn validate_all_config(cli: &Cli) -> CliResult {
    println!("🔧 Validating Crate Digger Configuration");
    if let Some(path) = &cli.config {
        println!("Config File: {}", path.display());
    }
    println!();

    let manager = load(cli)?;
    let config = manager.config();

    validate_catalog_config(config)?;
    validate_resilience_config(config)?;
    validate_pools_config(config)?;
    validate_orchestration_config(config)?;

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn validate_component(cli: &Cli, component_name: &str) -> CliResult {
    println!("🔧 Validating Component: {component_name}");

    let manager = load(cli)?;
    let config = manager.config();

    match component_name.to_lowercase().replace('-', "_").as_str() {
        "catalog" => validate_catalog_config(config)?,
        "rate_limiter" | "retry" | "circuit_breaker" | "cache" => {
            validate_resilience_config(config)?
        }
        "pools" => validate_pools_config(config)?,
        "orchestration" => validate_orchestration_config(config)?,
        _ => {
            return Err(format!("Unknown component: {component_name}").into());
        }
    }

    println!("✅ Component '{component_name}' validation passed!");
    Ok(())
}

fn show_config(cli: &Cli) -> CliResult {
    let manager = load(cli)?;
    println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
    Ok(())
}

fn validate_catalog_config(config: &AggregatorConfig) -> CliResult {
    println!("\n📡 Catalog API");
    CatalogUrlBuilder::new(&config.catalog)?;
    println!("   ✅ API base URL: {}", config.catalog.api_base_url);
    println!("   ✅ Site base URL: {}", config.catalog.site_base_url);
    println!(
        "   {} Token: {}",
        if config.catalog.token.is_some() { "✅" } else { "⚠️ " },
        if config.catalog.token.is_some() {
            "configured"
        } else {
            "not set (unauthenticated rate limits apply)"
        }
    );
    println!("   ✅ Request timeout: {}ms", config.catalog.request_timeout_ms);
    HtmlListingsParser::new(&config.catalog.listing_selectors)?;
    println!(
        "   ✅ Listing selectors: rows match {:?}",
        config.catalog.listing_selectors.row
    );
    Ok(())
}

fn validate_resilience_config(config: &AggregatorConfig) -> CliResult {
    println!("\n🛡️  Resilience");
    let settings = config.client_settings();

    settings.rate_limiter.validate()?;
    println!(
        "   ✅ Rate limiter: {}/min, burst {}",
        settings.rate_limiter.requests_per_minute, settings.rate_limiter.burst
    );

    settings.retry.validate()?;
    println!(
        "   ✅ Retry: {} attempts, {:?} delay, {:?} rate-limit cooldown",
        settings.retry.max_attempts, settings.retry.retry_delay, settings.retry.rate_limit_cooldown
    );

    settings.circuit_breaker.validate()?;
    println!(
        "   ✅ Circuit breaker: opens after {} failures, {:?} timeout, {} half-open calls",
        settings.circuit_breaker.failure_threshold,
        settings.circuit_breaker.timeout,
        settings.circuit_breaker.half_open_max_calls
    );

    settings.cache.validate()?;
    println!(
        "   ✅ Cache: {:?} TTL, {} entries per namespace",
        settings.cache.ttl, settings.cache.max_entries
    );
    Ok(())
}

fn validate_pools_config(config: &AggregatorConfig) -> CliResult {
    println!("\n🧵 Worker Pools");
    config.validate()?;
    for stats in config.worker_pools().stats() {
        println!("   ✅ {}: concurrency {}", stats.name, stats.concurrency);
    }
    println!("   ✅ Queue capacity: {}", config.pools.queue_capacity);
    Ok(())
}

fn validate_orchestration_config(config: &AggregatorConfig) -> CliResult {
    println!("\n🎛️  Orchestration");
    config.validate()?;
    println!(
        "   ✅ Per-query timeout: {}ms",
        config.orchestration.per_query_timeout_ms
    );
    println!(
        "   ✅ Vinyl variants: {}",
        config.orchestration.vinyl_variants.join(", ")
    );
    println!(
        "   ✅ UK shipping countries: {}",
        config.orchestration.uk_shipping_countries.join(", ")
    );
    Ok(())
}

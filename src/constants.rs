//! # System Constants
//!
//! Fixed values that define the operational boundaries of the engine. Tunable
//! values live in [`crate::config`]; the defaults there are drawn from here.

/// Format vocabulary understood by query expansion and the search pipeline
pub mod formats {
    /// Catalog format value used for compilation searches
    pub const COMPILATION: &str = "Compilation";

    /// Lowercased spellings of the umbrella "every vinyl variant" format
    pub const ALL_VINYL_ALIASES: &[&str] = &["all vinyl", "all", "all vinyl variants"];

    /// Lowercased spellings of the various-artists compilation format
    pub const COMPILATION_ALIASES: &[&str] = &[
        "compilation",
        "various artists compilation",
        "various compilation",
    ];

    /// Concrete formats an umbrella vinyl query expands to
    pub const DEFAULT_VINYL_VARIANTS: &[&str] = &["Vinyl", "LP", "12\"", "7\"", "10\""];
}

/// Defaults for the resilience stack
pub mod resilience {
    pub const MAX_RETRY_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAY_MS: u64 = 2_000;
    pub const RATE_LIMIT_COOLDOWN_MS: u64 = 30_000;
    pub const RATE_LIMIT_POLL_INTERVAL_MS: u64 = 100;
    pub const REQUESTS_PER_MINUTE: u32 = 55;
    pub const RATE_LIMIT_BURST: u32 = 5;
    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
    pub const CIRCUIT_TIMEOUT_SECONDS: u64 = 60;
    pub const CIRCUIT_HALF_OPEN_MAX_CALLS: u32 = 3;
    pub const CACHE_TTL_SECONDS: u64 = 600;
    pub const CACHE_MAX_ENTRIES: usize = 10_000;
}

/// Cache namespaces, one per logical result type
pub mod cache_namespaces {
    pub const SEARCH: &str = "search";
    pub const RELEASE: &str = "release";
    pub const MARKETPLACE_QUOTE: &str = "marketplace_quote";
    pub const LISTINGS: &str = "listings";
    pub const COLLECTION: &str = "collection";
}

/// Catalog endpoints and site defaults
pub mod catalog {
    pub const API_BASE_URL: &str = "https://api.discogs.com";
    pub const SITE_BASE_URL: &str = "https://www.discogs.com";
    pub const DEFAULT_CATALOG_TYPE: &str = "release";
    pub const PER_PAGE: u32 = 100;
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
    pub const MARKETPLACE_CURRENCY: &str = "GBP";
    pub const USER_AGENT: &str = concat!("crate-digger/", env!("CARGO_PKG_VERSION"));
}

/// Destinations that count as UK shipping for availability checks
pub const UK_SHIPPING_COUNTRIES: &[&str] = &["United Kingdom", "UK"];

/// Default per-physical-query timeout
pub const PER_QUERY_TIMEOUT_MS: u64 = 60_000;

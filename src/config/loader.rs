//! Configuration Loader
//!
//! Builds an [`AggregatorConfig`] from layered sources with the `config` crate:
//! defaults, then a TOML file, then environment variables such as
//! `CRATE_DIGGER__RETRY__MAX_ATTEMPTS=5`.

use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::AggregatorConfig;
use crate::error::{AggregatorError, AggregatorResult};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config/crate-digger.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CRATE_DIGGER";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AggregatorConfig,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// used when present and skipped otherwise.
    pub fn load(path: Option<&Path>) -> AggregatorResult<Self> {
        let (file, source_file) = match path {
            Some(path) => (File::from(path).required(true), Some(path.to_path_buf())),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                let exists = default.exists();
                (
                    File::from(default.as_path()).required(false),
                    exists.then_some(default),
                )
            }
        };

        debug!(
            config_file = ?source_file.as_ref().map(|p| p.display().to_string()),
            "Loading configuration"
        );

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("orchestration.vinyl_variants")
                    .with_list_parse_key("orchestration.uk_shipping_countries")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AggregatorError::Configuration(format!("Failed to read configuration: {e}")))?;

        let config: AggregatorConfig = settings
            .try_deserialize()
            .map_err(|e| AggregatorError::Configuration(format!("Invalid configuration: {e}")))?;

        config.validate()?;

        info!(
            config_file = ?source_file.as_ref().map(|p| p.display().to_string()),
            api_base_url = %config.catalog.api_base_url,
            requests_per_minute = config.rate_limiter.requests_per_minute,
            "Configuration loaded successfully"
        );

        Ok(Self {
            config,
            source_file,
        })
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(config: AggregatorConfig) -> AggregatorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source_file: None,
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn into_config(self) -> AggregatorConfig {
        self.config
    }

    /// The file the configuration was read from, if any
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Configuration as JSON with secrets redacted, for display and logging
    pub fn debug_config(&self) -> serde_json::Value {
        let mut sanitized = self.config.clone();
        if sanitized.catalog.token.is_some() {
            sanitized.catalog.token = Some("***REDACTED***".to_string());
        }
        serde_json::to_value(&sanitized).unwrap_or_else(|_| serde_json::json!({}))
    }
}

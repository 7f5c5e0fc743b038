//! Configuration infrastructure
//!
//! Contains configuration loading and management for review scraping.
//!
//! Configuration is read from a JSON file and can be overridden per key with
//! `REVIEW_TRACKER__SECTION__KEY` environment variables. The app registry lives
//! here too, so nothing about tracked apps is hard-coded in the pipeline.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::domain::{AppRegistry, TrackedApp};
use crate::infrastructure::parsing::config::ReviewListSelectors;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "REVIEW_TRACKER_CONFIG";

/// Prefix for per-key environment overrides
pub const ENV_PREFIX: &str = "REVIEW_TRACKER";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Tracked apps: logical name -> App Store slug
    pub apps: Vec<TrackedApp>,
}

impl AppConfig {
    pub fn registry(&self) -> AppRegistry {
        AppRegistry::new(self.apps.clone())
    }
}

/// Scraping behaviour: fetcher, pagination and selectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Review host, e.g. `https://apps.shopify.com`
    pub base_url: String,

    /// Browser-like user agent sent with every request
    pub user_agent: String,

    pub request_timeout_seconds: u64,

    /// The App Store certificate chain trips some TLS stacks
    pub accept_invalid_certs: bool,

    /// Hard ceiling enforced by the HTTP client's rate limiter
    pub max_requests_per_second: u32,

    /// Fixed courtesy delay between page fetches
    pub request_delay_ms: u64,

    /// Consecutive empty pages that mean "end of listing"
    pub empty_page_streak: u32,

    /// Runaway-loop guard
    pub max_pages: u32,

    /// Extra attempts per page before a run is aborted
    pub fetch_retries: u32,

    /// Base delay of the exponential retry backoff
    pub retry_delay_ms: u64,

    pub selectors: ReviewListSelectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: shopify::BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            accept_invalid_certs: defaults::ACCEPT_INVALID_CERTS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
            empty_page_streak: defaults::EMPTY_PAGE_STREAK,
            max_pages: defaults::MAX_PAGES,
            fetch_retries: defaults::FETCH_RETRIES,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            selectors: ReviewListSelectors::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:data/reviews.db`
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs in the log file
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    pub file_name: String,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,

    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("shopify_review_tracker".to_string(), "info".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
    /// Replaces the process environment as override source (tests)
    env_source: Option<HashMap<String, String>>,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Resolve the config path from `REVIEW_TRACKER_CONFIG` or the user config dir
    pub fn new() -> Result<Self> {
        let config_path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME),
        };

        Ok(Self::with_path(config_path))
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            env_source: None,
        }
    }

    /// Use the given map instead of the process environment for overrides
    pub fn with_env_source(mut self, vars: HashMap<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// Write the default configuration if no file exists yet, then load it
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("🎉 First run detected - writing default configuration");
            self.save_config(&AppConfig::default()).await?;
        }

        self.load_config().await
    }

    /// Load configuration: JSON file (optional) overlaid with environment overrides
    pub async fn load_config(&self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        if self.config_path.exists() {
            let path = self.config_path.to_string_lossy();
            builder = builder.add_source(File::new(&path, FileFormat::Json));
        } else {
            info!(
                "Configuration file not found, using defaults: {:?}",
                self.config_path
            );
        }

        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(self.env_source.clone());

        let settings = builder
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", self.config_path))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Configuration has an invalid shape")?;

        info!(
            "Loaded configuration ({} tracked apps) from: {:?}",
            config.apps.len(),
            self.config_path
        );
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Shopify App Store URLs
pub mod shopify {
    use url::Url;

    /// Review host
    pub const BASE_URL: &str = "https://apps.shopify.com";

    /// Listing order; newest first keeps incremental runs short
    pub const SORT_ORDER: &str = "newest";

    /// Build `<base>/<slug>/reviews?sort_by=newest&page=<n>`
    pub fn reviews_page_url(base_url: &str, slug: &str, page: u32) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base_url)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(slug.trim_matches('/'))
            .push("reviews");
        url.query_pairs_mut()
            .clear()
            .append_pair("sort_by", SORT_ORDER)
            .append_pair("page", &page.to_string());
        Ok(url)
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "shopify-review-tracker";
    pub const CONFIG_FILE_NAME: &str = "review_tracker_config.json";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const ACCEPT_INVALID_CERTS: bool = true;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 1;

    /// Default delay between page fetches in milliseconds
    pub const REQUEST_DELAY_MS: u64 = 1000;

    pub const EMPTY_PAGE_STREAK: u32 = 3;
    pub const MAX_PAGES: u32 = 150;
    pub const FETCH_RETRIES: u32 = 2;
    pub const RETRY_DELAY_MS: u64 = 2000;

    pub const DATABASE_URL: &str = "sqlite:data/reviews.db";
    pub const DB_MAX_CONNECTIONS: u32 = 5;

    // Log configuration defaults
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_FILE_NAME: &str = "review-tracker.log";
    pub const LOG_MAX_FILES: u32 = 5;
    pub const LOG_AUTO_CLEANUP: bool = true;
}

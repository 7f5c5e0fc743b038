//! Infrastructure layer for configuration, HTTP, parsing and storage
//!
//! Everything here talks to the outside world: the review host, the SQLite
//! database, the config file and the log sinks.

pub mod config; // Configuration file, environment overrides and defaults
pub mod database_connection;
pub mod http_client; // Page fetcher
pub mod logging;
pub mod parsing; // Review extraction
pub mod parsing_error;
pub mod review_repository;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, DatabaseConfig, LoggingConfig, ScraperConfig, shopify};
pub use database_connection::DatabaseConnection;
pub use http_client::{FetchError, HttpClient, HttpClientConfig, PageFetcher};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing::{PageExtraction, ParseContext, ParsingError, ParsingResult, ReviewListParser, ReviewListSelectors};
pub use review_repository::SqliteReviewRepository;

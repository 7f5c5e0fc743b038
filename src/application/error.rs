//! Errors that end a single app's scrape run

use thiserror::Error;

use crate::infrastructure::http_client::FetchError;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Retries exhausted; reviews already stored stay stored
    #[error("Fetching page {page} failed: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error("Unknown app '{0}'")]
    UnknownApp(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

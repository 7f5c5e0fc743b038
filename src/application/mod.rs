//! Application layer - scraping workflow and read-side services
//!
//! Coordinates the page fetcher, the extractor and the review repository:
//! pagination per app, deduplicated storage, run reports and statistics.

pub mod error;
pub mod pagination_driver;
pub mod review_stats;
pub mod review_store;
pub mod scrape_service;

// Re-export commonly used items
pub use error::ScrapeError;
pub use pagination_driver::{PaginationDriver, PaginationRun, PaginationSettings, StopReason};
pub use review_stats::{RecentReviews, ReviewStats, ReviewStatsService, WindowCount};
pub use review_store::{DeduplicatingStore, StoreReport};
pub use scrape_service::{AppScrapeReport, ScrapeOutcome, ScrapeService};

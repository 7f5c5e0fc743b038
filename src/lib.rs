//! Shopify Review Tracker - App Store review scraping and statistics
//!
//! Scrapes the public review listings of tracked Shopify apps, stores each
//! review once in SQLite and serves date-windowed counts over what is stored.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the types binaries and tests reach for
pub use application::{AppScrapeReport, ScrapeError, ScrapeOutcome, ScrapeService};
pub use domain::{AppRegistry, Rating, Review, TrackedApp};
pub use infrastructure::{AppConfig, ConfigManager};

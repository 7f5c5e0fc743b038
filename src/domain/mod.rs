//! Domain module - reviews, tracked apps and the storage contract
//!
//! This module contains the entities and value objects the scraping pipeline
//! produces and the repository trait it persists through.

pub mod app_registry;
pub mod repositories;
pub mod review;

// Re-export commonly used items
pub use app_registry::{AppRegistry, TargetTotal, TrackedApp};
pub use repositories::{InsertOutcome, RatingDistribution, ReviewRepository};
pub use review::{
    DedupKey, EARLIEST_REVIEW_YEAR, Rating, RatingError, Review, UNKNOWN_COUNTRY, UNKNOWN_STORE,
    date_is_plausible, normalize_whitespace,
};

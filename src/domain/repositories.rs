//! Repository interfaces for review storage
//!
//! The storage layer is a plain SQL sink. Everything the pipeline needs from it
//! is expressed here so the application layer can run against any backend.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::review::{DedupKey, Rating, Review};

/// What happened to a single insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The dedup key already existed, possibly written by a concurrent run
    Duplicate,
}

/// Review count per star rating; every rating is present, even at zero
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDistribution {
    counts: [u64; 5],
}

impl RatingDistribution {
    pub fn set(&mut self, rating: Rating, count: u64) {
        self.counts[usize::from(rating.value() - 1)] = count;
    }

    pub fn get(&self, rating: Rating) -> u64 {
        self.counts[usize::from(rating.value() - 1)]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rating, u64)> + '_ {
        Rating::all().map(move |rating| (rating, self.get(rating)))
    }
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn exists(&self, key: &DedupKey) -> Result<bool>;

    /// Insert a review; a uniqueness violation is reported as `Duplicate`
    async fn insert(&self, review: &Review) -> Result<InsertOutcome>;

    async fn count_for_app(&self, app_name: &str) -> Result<u64>;
    async fn count_since(&self, app_name: &str, since: NaiveDate) -> Result<u64>;
    async fn rating_distribution(&self, app_name: &str) -> Result<RatingDistribution>;
    async fn reviews_since(&self, app_name: &str, since: NaiveDate) -> Result<Vec<Review>>;
}

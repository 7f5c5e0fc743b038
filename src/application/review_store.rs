//! Deduplicating review store
//!
//! Check-then-insert per record against the dedup key. The check keeps the
//! common case cheap; the storage-level UNIQUE constraint settles races with
//! concurrent runs, which surface as `InsertOutcome::Duplicate`.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{InsertOutcome, Review, ReviewRepository, date_is_plausible};

/// Per-batch (or per-run, once merged) storage counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreReport {
    pub found: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Records refused before reaching storage (placeholder dates)
    pub rejected: usize,
}

impl StoreReport {
    pub fn merge(&mut self, other: StoreReport) {
        self.found += other.found;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.rejected += other.rejected;
    }
}

#[derive(Clone)]
pub struct DeduplicatingStore {
    repository: Arc<dyn ReviewRepository>,
}

impl DeduplicatingStore {
    pub fn new(repository: Arc<dyn ReviewRepository>) -> Self {
        Self { repository }
    }

    /// Persist one record unless its dedup key is already stored
    pub async fn store(&self, review: &Review) -> Result<InsertOutcome> {
        let key = review.dedup_key();
        if self.repository.exists(&key).await? {
            debug!("Duplicate review skipped: {}", key);
            return Ok(InsertOutcome::Duplicate);
        }

        let outcome = self.repository.insert(review).await?;
        if outcome == InsertOutcome::Inserted {
            debug!("Stored review {}", key);
        }
        Ok(outcome)
    }

    /// Persist a batch of candidates for one app
    pub async fn store_batch(&self, reviews: &[Review]) -> Result<StoreReport> {
        let mut report = StoreReport {
            found: reviews.len(),
            ..StoreReport::default()
        };

        for review in reviews {
            if !date_is_plausible(review.review_date) {
                warn!("Refusing review {} with placeholder date", review.dedup_key());
                report.rejected += 1;
                continue;
            }

            match self.store(review).await? {
                InsertOutcome::Inserted => report.inserted += 1,
                InsertOutcome::Duplicate => report.duplicates += 1,
            }
        }

        Ok(report)
    }
}

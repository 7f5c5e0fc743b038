//! SQLite implementation of the review repository
//!
//! Parameterized INSERT/SELECT statements only. A uniqueness violation on
//! insert is a duplicate, not a failure: another run may have written the
//! same review between our existence check and our insert.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::repositories::{InsertOutcome, RatingDistribution, ReviewRepository};
use crate::domain::review::{DedupKey, Rating, Review};

#[derive(Clone)]
pub struct SqliteReviewRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    fn review_from_row(row: &SqliteRow) -> Result<Review> {
        let rating: i64 = row.try_get("rating")?;
        Ok(Review {
            app_name: row.try_get("app_name")?,
            store_name: row.try_get("store_name")?,
            country_name: row.try_get("country_name")?,
            rating: Rating::try_from(rating)?,
            review_content: row.try_get("review_content")?,
            review_date: row.try_get("review_date")?,
        })
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn exists(&self, key: &DedupKey) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reviews
                WHERE app_name = ? AND store_name = ? AND review_date = ? AND rating = ?
            ) AS found
            "#,
        )
        .bind(&key.app_name)
        .bind(&key.store_name)
        .bind(key.review_date)
        .bind(i64::from(key.rating.value()))
        .fetch_one(&*self.pool)
        .await
        .with_context(|| format!("Failed to look up review {key}"))?;

        Ok(row.get::<i64, _>("found") != 0)
    }

    async fn insert(&self, review: &Review) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (
                app_name, store_name, country_name, rating, review_content, review_date, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&review.app_name)
        .bind(&review.store_name)
        .bind(&review.country_name)
        .bind(i64::from(review.rating.value()))
        .bind(&review.review_content)
        .bind(review.review_date)
        .bind(chrono::Utc::now())
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("Concurrent insert already stored {}", review.dedup_key());
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to insert review {}", review.dedup_key())),
        }
    }

    async fn count_for_app(&self, app_name: &str) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM reviews WHERE app_name = ?")
            .bind(app_name)
            .fetch_one(&*self.pool)
            .await
            .context("Failed to count reviews")?;

        Ok(u64::try_from(row.get::<i64, _>("n"))?)
    }

    async fn count_since(&self, app_name: &str, since: NaiveDate) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM reviews WHERE app_name = ? AND review_date >= ?")
            .bind(app_name)
            .bind(since)
            .fetch_one(&*self.pool)
            .await
            .context("Failed to count recent reviews")?;

        Ok(u64::try_from(row.get::<i64, _>("n"))?)
    }

    async fn rating_distribution(&self, app_name: &str) -> Result<RatingDistribution> {
        let rows = sqlx::query("SELECT rating, COUNT(*) AS n FROM reviews WHERE app_name = ? GROUP BY rating")
            .bind(app_name)
            .fetch_all(&*self.pool)
            .await
            .context("Failed to compute rating distribution")?;

        let mut distribution = RatingDistribution::default();
        for row in rows {
            let rating = Rating::try_from(row.get::<i64, _>("rating"))?;
            distribution.set(rating, u64::try_from(row.get::<i64, _>("n"))?);
        }
        Ok(distribution)
    }

    async fn reviews_since(&self, app_name: &str, since: NaiveDate) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            r#"
            SELECT app_name, store_name, country_name, rating, review_content, review_date
            FROM reviews
            WHERE app_name = ? AND review_date >= ?
            ORDER BY review_date DESC, id DESC
            "#,
        )
        .bind(app_name)
        .bind(since)
        .fetch_all(&*self.pool)
        .await
        .context("Failed to load reviews")?;

        rows.iter().map(Self::review_from_row).collect()
    }
}

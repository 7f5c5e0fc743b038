//! Read-side statistics over stored reviews
//!
//! Date-windowed counts and the rating distribution, shaped as the JSON the
//! dashboard consumes.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::application::ScrapeError;
use crate::domain::{AppRegistry, Review, ReviewRepository};

/// Length of the rolling window
pub const ROLLING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowCount {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub success: bool,
    pub app_name: String,
    pub this_month: WindowCount,
    pub last_30_days: WindowCount,
    /// "1".."5" -> count; every key is always present
    pub distribution: BTreeMap<String, u64>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentReviews {
    pub success: bool,
    pub app_name: String,
    pub since: NaiveDate,
    pub reviews: Vec<Review>,
}

pub fn first_day_of_month(today: NaiveDate) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
        .with_context(|| format!("no first day for the month of {today}"))
}

pub fn rolling_window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(ROLLING_WINDOW_DAYS)
}

pub struct ReviewStatsService {
    repository: Arc<dyn ReviewRepository>,
    registry: Option<AppRegistry>,
}

impl ReviewStatsService {
    pub fn new(repository: Arc<dyn ReviewRepository>) -> Self {
        Self {
            repository,
            registry: None,
        }
    }

    /// Resolve names through the registry; unknown apps become errors
    pub fn with_registry(mut self, registry: AppRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Stored logical name for `app_name`
    fn resolve(&self, app_name: &str) -> Result<String> {
        match &self.registry {
            Some(registry) => registry
                .find(app_name)
                .map(|app| app.app_name.clone())
                .ok_or_else(|| ScrapeError::UnknownApp(app_name.to_string()).into()),
            None => Ok(app_name.to_string()),
        }
    }

    pub async fn stats(&self, app_name: &str, today: NaiveDate) -> Result<ReviewStats> {
        let app_name = self.resolve(app_name)?;
        let app_name = app_name.as_str();
        let this_month = self
            .repository
            .count_since(app_name, first_day_of_month(today)?)
            .await?;
        let last_30_days = self
            .repository
            .count_since(app_name, rolling_window_start(today))
            .await?;
        let distribution = self.repository.rating_distribution(app_name).await?;
        let total = self.repository.count_for_app(app_name).await?;

        Ok(ReviewStats {
            success: true,
            app_name: app_name.to_string(),
            this_month: WindowCount { count: this_month },
            last_30_days: WindowCount { count: last_30_days },
            distribution: distribution
                .iter()
                .map(|(rating, count)| (rating.to_string(), count))
                .collect(),
            total,
        })
    }

    /// Reviews inside the rolling window, newest first
    pub async fn recent_reviews(&self, app_name: &str, today: NaiveDate) -> Result<RecentReviews> {
        let app_name = self.resolve(app_name)?;
        let app_name = app_name.as_str();
        let since = rolling_window_start(today);
        let reviews = self.repository.reviews_since(app_name, since).await?;
        Ok(RecentReviews {
            success: true,
            app_name: app_name.to_string(),
            since,
            reviews,
        })
    }
}

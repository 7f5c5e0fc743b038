//! Pagination driver
//!
//! Walks one app's review listing page by page, strictly in sequence:
//!
//! ```text
//! Start -> FetchingPage -> HasRecords     -> FetchingPage(next)
//!                       -> Empty          -> FetchingPage(next) | StreakExhausted
//!                       -> TargetReached  -> Done
//!                       -> Error          -> Aborted (stored reviews are kept)
//! ```
//!
//! A page limit bounds runaway listings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::error::ScrapeError;
use super::review_store::{DeduplicatingStore, StoreReport};
use crate::domain::{DedupKey, Review, TargetTotal, TrackedApp};
use crate::infrastructure::config::{ScraperConfig, shopify};
use crate::infrastructure::http_client::{FetchError, PageFetcher};
use crate::infrastructure::parsing::{ParseContext, ReviewListParser};

/// Why the driver stopped requesting pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `empty_page_streak` consecutive pages without new records
    StreakExhausted,
    TargetReached,
    PageLimit,
    FetchFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::StreakExhausted => "end of listing",
            Self::TargetReached => "target reached",
            Self::PageLimit => "page limit",
            Self::FetchFailed => "fetch failed",
        };
        f.write_str(text)
    }
}

/// Driver tuning, usually taken from `ScraperConfig`
#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub base_url: String,
    pub empty_page_streak: u32,
    pub max_pages: u32,
    pub request_delay: Duration,
    pub fetch_retries: u32,
    pub retry_delay: Duration,
}

impl PaginationSettings {
    pub fn from_scraper_config(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            empty_page_streak: config.empty_page_streak.max(1),
            max_pages: config.max_pages,
            request_delay: Duration::from_millis(config.request_delay_ms),
            fetch_retries: config.fetch_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self::from_scraper_config(&ScraperConfig::default())
    }
}

/// What one app's run produced
#[derive(Debug)]
pub struct PaginationRun {
    pub pages_fetched: u32,
    /// Unique records extracted across the run
    pub records_found: usize,
    /// Containers dropped by the extractor (no rating, bad date, ...)
    pub records_dropped: usize,
    pub store: StoreReport,
    pub stop_reason: StopReason,
    /// Set when the run was aborted by a fetch failure
    pub failure: Option<ScrapeError>,
}

pub struct PaginationDriver {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<ReviewListParser>,
    store: DeduplicatingStore,
    settings: PaginationSettings,
}

impl PaginationDriver {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<ReviewListParser>,
        store: DeduplicatingStore,
        settings: PaginationSettings,
    ) -> Self {
        Self {
            fetcher,
            parser,
            store,
            settings,
        }
    }

    /// Scrape every page of one app's listing.
    ///
    /// A fetch failure ends the run with `StopReason::FetchFailed` and the
    /// partial counts; only storage or configuration problems return `Err`.
    pub async fn run(&self, app: &TrackedApp) -> Result<PaginationRun, ScrapeError> {
        info!("Scraping reviews for {} ({})", app.app_name, app.slug);

        let mut target = match app.target {
            TargetTotal::Fixed(total) => Some(total),
            TargetTotal::Unbounded | TargetTotal::FromPage => None,
        };
        let mut seen: HashSet<DedupKey> = HashSet::new();
        let mut store = StoreReport::default();
        let mut pages_fetched = 0;
        let mut records_dropped = 0;
        let mut empty_streak = 0;
        let mut failure = None;
        let mut page: u32 = 1;

        let stop_reason = loop {
            if page > self.settings.max_pages {
                warn!("{}: page limit {} reached", app.app_name, self.settings.max_pages);
                break StopReason::PageLimit;
            }
            if page > 1 && !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }

            let url = shopify::reviews_page_url(&self.settings.base_url, &app.slug, page)
                .map_err(|e| ScrapeError::Configuration(format!("cannot build URL for '{}': {}", app.slug, e)))?;

            let markup = match self.fetch_with_retry(url.as_str()).await {
                Ok(markup) => markup,
                Err(source) => {
                    error!("{}: aborting at page {}: {}", app.app_name, page, source);
                    failure = Some(ScrapeError::Fetch { page, source });
                    break StopReason::FetchFailed;
                }
            };
            pages_fetched += 1;

            let context = ParseContext::new(app.app_name.clone(), page).with_source_url(url.as_str());
            let extraction = self
                .parser
                .parse_page(&markup, &context)
                .map_err(|e| ScrapeError::Configuration(e.to_string()))?;
            records_dropped += extraction.dropped.len();
            let advertised = extraction.total_hint;

            let fresh: Vec<Review> = extraction
                .reviews
                .into_iter()
                .filter(|review| seen.insert(review.dedup_key()))
                .collect();

            // A total below what is already seen cannot be the listing's count
            if target.is_none() && app.target == TargetTotal::FromPage {
                match advertised {
                    Some(total) if total as usize >= seen.len() => {
                        info!("{}: listing advertises {} reviews", app.app_name, total);
                        target = Some(total);
                    }
                    Some(total) => warn!(
                        "{}: ignoring advertised total {} below {} reviews already seen",
                        app.app_name,
                        total,
                        seen.len()
                    ),
                    None => {}
                }
            }

            if fresh.is_empty() {
                empty_streak += 1;
                debug!("{}: page {} empty (streak {})", app.app_name, page, empty_streak);
                if empty_streak >= self.settings.empty_page_streak {
                    break StopReason::StreakExhausted;
                }
            } else {
                empty_streak = 0;
                let report = self.store.store_batch(&fresh).await.map_err(ScrapeError::Storage)?;
                info!(
                    "{}: page {} found {}, inserted {}, duplicates {}",
                    app.app_name, page, report.found, report.inserted, report.duplicates
                );
                store.merge(report);
            }

            if let Some(total) = target {
                if seen.len() >= total as usize {
                    info!("{}: reached target of {} reviews", app.app_name, total);
                    break StopReason::TargetReached;
                }
            }

            page += 1;
        };

        Ok(PaginationRun {
            pages_fetched,
            records_found: seen.len(),
            records_dropped,
            store,
            stop_reason,
            failure,
        })
    }

    /// Exponential backoff with jitter; non-retryable failures return at once
    async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetcher.fetch_page(url).await {
                Ok(markup) => return Ok(markup),
                Err(e) if attempt < self.settings.fetch_retries && e.is_retryable() => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "Fetch attempt {} for {} failed: {}. Retrying in {:?}",
                        attempt, url, e, delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.settings.retry_delay;
        if base.is_zero() {
            return Duration::ZERO;
        }
        let exponential = base.saturating_mul(2_u32.saturating_pow(attempt));
        let jitter_ceiling = u64::try_from(base.as_millis() / 4).unwrap_or(u64::MAX);
        exponential + Duration::from_millis(fastrand::u64(0..=jitter_ceiling))
    }
}

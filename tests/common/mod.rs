//! Shared fixtures for integration tests
//!
//! In-memory SQLite, a scripted page fetcher and a markup builder for
//! listing pages.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use shopify_review_tracker::application::{DeduplicatingStore, PaginationDriver, PaginationSettings};
use shopify_review_tracker::infrastructure::{
    DatabaseConnection, FetchError, PageFetcher, ReviewListParser, SqliteReviewRepository,
};

/// Fresh in-memory database per test
pub struct TestDatabase {
    pub connection: DatabaseConnection,
}

impl TestDatabase {
    pub async fn new() -> Result<Self> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        db.migrate().await?;
        Ok(Self { connection: db })
    }

    pub fn repository(&self) -> Arc<SqliteReviewRepository> {
        Arc::new(SqliteReviewRepository::new(self.connection.pool().clone()))
    }
}

/// One scripted response per page number; pages not scripted come back empty
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<u32, Result<String, FetchError>>,
    /// Failures served before the scripted response, per page
    transient_failures: Mutex<HashMap<u32, u32>>,
    /// Apps whose every page answers 500
    broken_slugs: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, markup: String) -> Self {
        self.pages.insert(page, Ok(markup));
        self
    }

    pub fn failing_page(mut self, page: u32, status: u16) -> Self {
        self.pages.insert(
            page,
            Err(FetchError::Status {
                status,
                url: format!("page {page}"),
            }),
        );
        self
    }

    pub fn broken_slug(mut self, slug: &str) -> Self {
        self.broken_slugs.push(slug.to_string());
        self
    }

    pub fn flaky_page(self, page: u32, failures: u32) -> Self {
        self.transient_failures.lock().unwrap().insert(page, failures);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

fn page_number(url: &str) -> u32 {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.query_pairs().find(|(k, _)| k == "page").and_then(|(_, v)| v.parse().ok()))
        .unwrap_or(0)
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let page = page_number(url);

        if self.broken_slugs.iter().any(|slug| url.contains(&format!("/{slug}/"))) {
            return Err(FetchError::Status {
                status: 500,
                url: url.to_string(),
            });
        }

        {
            let mut transient = self.transient_failures.lock().unwrap();
            if let Some(remaining) = transient.get_mut(&page) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(FetchError::Status {
                        status: 503,
                        url: url.to_string(),
                    });
                }
            }
        }

        self.pages
            .get(&page)
            .cloned()
            .unwrap_or_else(|| Ok(listing_page(&[], None)))
    }
}

/// One review as rendered by the listing
pub struct ReviewMarkup<'a> {
    pub stars: usize,
    pub store: &'a str,
    pub date: &'a str,
    pub body: &'a str,
    pub country: Option<&'a str>,
}

impl<'a> ReviewMarkup<'a> {
    pub fn new(stars: usize, store: &'a str, date: &'a str, body: &'a str) -> Self {
        Self {
            stars,
            store,
            date,
            body,
            country: None,
        }
    }

    pub fn from_country(mut self, country: &'a str) -> Self {
        self.country = Some(country);
        self
    }

    pub fn render(&self) -> String {
        let filled = "<svg class=\"tw-fill-fg-primary\" viewBox=\"0 0 20 20\"></svg>".repeat(self.stars);
        let empty = "<svg class=\"tw-fill-fg-tertiary\" viewBox=\"0 0 20 20\"></svg>".repeat(5 - self.stars.min(5));
        let location = self
            .country
            .map(|c| format!("<div class=\"review-metadata\">{} from {}</div>", self.store, c))
            .unwrap_or_default();
        format!(
            r#"<div data-merchant-review="" class="tw-pb-md">
                 <div class="tw-flex tw-items-center" role="img">{filled}{empty}</div>
                 <div class="tw-text-body-xs tw-text-fg-tertiary">{date}</div>
                 <div data-truncate-review=""><div data-truncate-content-copy=""><p>{body}</p></div></div>
                 <div class="review-merchant">
                   <span class="tw-text-heading-xs tw-text-fg-primary">{store}</span>
                   {location}
                 </div>
               </div>"#,
            date = self.date,
            body = self.body,
            store = self.store,
        )
    }
}

/// Full listing page; `total` adds JSON-LD review-count metadata
pub fn listing_page(reviews: &[ReviewMarkup<'_>], total: Option<u32>) -> String {
    let json_ld = total
        .map(|n| {
            format!(
                r#"<script type="application/ld+json">{{"@context":"https://schema.org","@type":"SoftwareApplication","aggregateRating":{{"@type":"AggregateRating","ratingValue":4.7,"reviewCount":{n}}}}}</script>"#
            )
        })
        .unwrap_or_default();
    let body: String = reviews.iter().map(ReviewMarkup::render).collect();
    format!("<!DOCTYPE html><html><head>{json_ld}</head><body><main>{body}</main></body></html>")
}

/// `count` distinct reviews for page `page`
pub fn page_of_reviews(page: u32, count: u32, total: Option<u32>) -> String {
    let stores: Vec<String> = (0..count).map(|i| format!("Store {page}-{i}")).collect();
    let reviews: Vec<ReviewMarkup<'_>> = stores
        .iter()
        .map(|store| ReviewMarkup::new(4, store, "August 11, 2025", "Works great"))
        .collect();
    listing_page(&reviews, total)
}

/// Driver settings with no waiting
pub fn fast_settings() -> PaginationSettings {
    PaginationSettings {
        base_url: "https://apps.shopify.com".to_string(),
        empty_page_streak: 3,
        max_pages: 50,
        request_delay: Duration::ZERO,
        fetch_retries: 2,
        retry_delay: Duration::ZERO,
    }
}

pub fn driver(
    fetcher: Arc<ScriptedFetcher>,
    db: &TestDatabase,
    settings: PaginationSettings,
) -> PaginationDriver {
    PaginationDriver::new(
        fetcher,
        Arc::new(ReviewListParser::new().unwrap()),
        DeduplicatingStore::new(db.repository()),
        settings,
    )
}

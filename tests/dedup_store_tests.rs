//! Deduplicating store: idempotence, dedup key stability and stored-row validity
mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::Row;

use common::{ScriptedFetcher, TestDatabase, driver, fast_settings, listing_page, page_of_reviews, ReviewMarkup};
use shopify_review_tracker::application::{DeduplicatingStore, StoreReport};
use shopify_review_tracker::domain::{InsertOutcome, Rating, Review, ReviewRepository, TargetTotal, TrackedApp};

fn review(store: &str, content: &str) -> Review {
    Review {
        app_name: "Acme Reviews".to_string(),
        store_name: store.to_string(),
        country_name: "Unknown".to_string(),
        rating: Rating::new(4).unwrap(),
        review_content: content.to_string(),
        review_date: NaiveDate::from_ymd_opt(2025, 8, 11).unwrap(),
    }
}

#[tokio::test]
async fn duplicate_across_runs_is_stored_once() {
    let db = TestDatabase::new().await.unwrap();
    let store = DeduplicatingStore::new(db.repository());

    let first = store.store_batch(&[review("Acme Co", "Works great")]).await.unwrap();
    let second = store.store_batch(&[review("Acme Co", "WORKS GREAT")]).await.unwrap();

    assert_eq!(
        first,
        StoreReport {
            found: 1,
            inserted: 1,
            duplicates: 0,
            rejected: 0
        }
    );
    assert_eq!(second.duplicates, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(db.repository().count_for_app("Acme Reviews").await.unwrap(), 1);
}

#[tokio::test]
async fn same_key_twice_in_one_batch() {
    let db = TestDatabase::new().await.unwrap();
    let store = DeduplicatingStore::new(db.repository());

    let report = store
        .store_batch(&[review("Acme Co", "first"), review("Acme Co", "second"), review("Other", "x")])
        .await
        .unwrap();

    assert_eq!(report.found, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.duplicates, 1);
}

#[tokio::test]
async fn concurrent_writers_never_fail_on_the_same_key() {
    let db = TestDatabase::new().await.unwrap();
    let a = DeduplicatingStore::new(db.repository());
    let b = DeduplicatingStore::new(db.repository());
    let batch = vec![review("Acme Co", "Works great"), review("Widget Barn", "Slow")];

    let (left, right) = tokio::join!(a.store_batch(&batch), b.store_batch(&batch));
    let (left, right) = (left.unwrap(), right.unwrap());

    assert_eq!(left.inserted + right.inserted, 2);
    assert_eq!(left.duplicates + right.duplicates, 2);
    assert_eq!(db.repository().count_for_app("Acme Reviews").await.unwrap(), 2);
}

#[tokio::test]
async fn repository_reports_unique_violation_as_duplicate() {
    let db = TestDatabase::new().await.unwrap();
    let repository = db.repository();

    assert_eq!(repository.insert(&review("Acme Co", "a")).await.unwrap(), InsertOutcome::Inserted);
    // Skips the existence check, as a racing writer would
    assert_eq!(repository.insert(&review("Acme Co", "b")).await.unwrap(), InsertOutcome::Duplicate);
}

#[tokio::test]
async fn placeholder_dates_never_reach_storage() {
    let db = TestDatabase::new().await.unwrap();
    let store = DeduplicatingStore::new(db.repository());
    let mut epoch = review("Acme Co", "old");
    epoch.review_date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

    let report = store.store_batch(&[epoch]).await.unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(report.inserted, 0);
    assert_eq!(db.repository().count_for_app("Acme Reviews").await.unwrap(), 0);
}

#[tokio::test]
async fn second_scrape_of_unchanged_listing_inserts_nothing() {
    let db = TestDatabase::new().await.unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .page(1, page_of_reviews(1, 10, None))
            .page(2, page_of_reviews(2, 7, None)),
    );
    let driver = driver(fetcher, &db, fast_settings());
    let app = TrackedApp::new("Acme Reviews", "acme-reviews").with_target(TargetTotal::Unbounded);

    let first = driver.run(&app).await.unwrap();
    let second = driver.run(&app).await.unwrap();

    assert_eq!(first.store.inserted, 17);
    assert_eq!(second.store.inserted, 0);
    assert_eq!(second.store.duplicates, 17);
    assert_eq!(db.repository().count_for_app("Acme Reviews").await.unwrap(), 17);
}

#[tokio::test]
async fn stored_rows_have_valid_ratings_and_dates() {
    let db = TestDatabase::new().await.unwrap();
    let page = listing_page(
        &[
            ReviewMarkup::new(5, "Good Shop", "June 3, 2025", "Great"),
            ReviewMarkup::new(0, "No Stars", "June 3, 2025", "Hmm"),
            ReviewMarkup::new(3, "Epoch Shop", "January 1, 1970", "Old"),
            ReviewMarkup::new(2, "Vague Shop", "last week", "Meh"),
            ReviewMarkup::new(1, "Bad Shop", "May 30, 2025", "Broken"),
        ],
        None,
    );
    let fetcher = Arc::new(ScriptedFetcher::new().page(1, page));
    let driver = driver(fetcher, &db, fast_settings());
    let app = TrackedApp::new("Acme Reviews", "acme-reviews").with_target(TargetTotal::Unbounded);

    let run = driver.run(&app).await.unwrap();
    assert_eq!(run.store.inserted, 2);
    assert_eq!(run.records_dropped, 3);

    let rows = sqlx::query("SELECT rating, review_date FROM reviews")
        .fetch_all(db.connection.pool())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        let rating: i64 = row.get("rating");
        let date: NaiveDate = row.get("review_date");
        assert!((1..=5).contains(&rating));
        assert_ne!(date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }
}

#[tokio::test]
async fn whitespace_does_not_split_the_dedup_key() {
    let db = TestDatabase::new().await.unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .page(1, listing_page(&[ReviewMarkup::new(4, "Acme   Co", "August 11, 2025", "Works  great")], None))
            .page(2, listing_page(&[ReviewMarkup::new(4, "Acme Co", "August 11, 2025", "Works great")], None)),
    );
    let driver = driver(fetcher, &db, fast_settings());
    let app = TrackedApp::new("Acme Reviews", "acme-reviews").with_target(TargetTotal::Unbounded);

    let run = driver.run(&app).await.unwrap();

    assert_eq!(run.records_found, 1);
    assert_eq!(db.repository().count_for_app("Acme Reviews").await.unwrap(), 1);
}

//! Review entity and its value objects
//!
//! A `Review` is one merchant opinion scraped from an app's review listing.
//! Construction goes through `Rating` and `NaiveDate` so a stored review can
//! never carry a rating outside 1..=5 or a missing date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Country placeholder used when the listing does not expose one
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Store-name placeholder, only ever applied as an explicit logged fallback
pub const UNKNOWN_STORE: &str = "Unknown Store";

/// Earliest year accepted as a real review date
pub const EARLIEST_REVIEW_YEAR: i32 = 2000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("Rating {0} is outside the 1..=5 star range")]
    OutOfRange(i64),
}

/// Star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError::OutOfRange(i64::from(value)))
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// All valid ratings in ascending order
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| RatingError::OutOfRange(value))
            .and_then(Self::new)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One scraped review for a tracked app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub app_name: String,
    pub store_name: String,
    pub country_name: String,
    pub rating: Rating,
    pub review_content: String,
    pub review_date: NaiveDate,
}

impl Review {
    /// Identity used for duplicate detection
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            app_name: self.app_name.clone(),
            store_name: self.store_name.clone(),
            review_date: self.review_date,
            rating: self.rating,
        }
    }
}

/// Approximate review identity: (app_name, store_name, review_date, rating).
///
/// The listing offers no stable review id, so two different reviews by the
/// same store on the same day with the same rating collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub app_name: String,
    pub store_name: String,
    pub review_date: NaiveDate,
    pub rating: Rating,
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}★",
            self.app_name, self.store_name, self.review_date, self.rating
        )
    }
}

/// False for epoch placeholders and anything older than the listing itself
pub fn date_is_plausible(date: NaiveDate) -> bool {
    date.year() >= EARLIEST_REVIEW_YEAR
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

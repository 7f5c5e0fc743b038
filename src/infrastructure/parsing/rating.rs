//! Star rating extraction with ordered fallback strategies
//!
//! 1. count filled star icons (capped at 5)
//! 2. parse an `aria-label` such as "4 out of 5 stars"
//! 3. scan visible text for a "4 star" token
//!
//! The first strategy yielding a value in 1..=5 wins. There is no default.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::domain::Rating;

static OUT_OF_FIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:stars?\s*)?out\s+of\s+5\b")
        .expect("aria-label rating pattern is a valid regex")
});

static STAR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([1-5])[\s-]*stars?\b").expect("star token pattern is a valid regex")
});

/// Which fallback produced the rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingStrategy {
    FilledStars,
    AriaLabel,
    StarText,
}

pub struct RatingExtractor {
    filled_star_selectors: Vec<Selector>,
    rating_label_selectors: Vec<Selector>,
}

impl RatingExtractor {
    pub fn new(filled_star_selectors: Vec<Selector>, rating_label_selectors: Vec<Selector>) -> Self {
        Self {
            filled_star_selectors,
            rating_label_selectors,
        }
    }

    /// Run the strategies in order against one review container
    pub fn extract(&self, container: &ElementRef) -> Option<(Rating, RatingStrategy)> {
        let attempts: [(RatingStrategy, Option<u8>); 3] = [
            (RatingStrategy::FilledStars, self.count_filled_stars(container)),
            (RatingStrategy::AriaLabel, self.from_aria_label(container)),
            (RatingStrategy::StarText, rating_from_text(&visible_text(container))),
        ];

        attempts
            .into_iter()
            .find_map(|(strategy, value)| value.and_then(|v| Rating::new(v).ok()).map(|r| (r, strategy)))
    }

    /// Whether the container shows any rating indicator at all
    pub fn has_indicator(&self, container: &ElementRef) -> bool {
        self.filled_star_selectors
            .iter()
            .chain(self.rating_label_selectors.iter())
            .any(|selector| container.select(selector).next().is_some())
    }

    fn count_filled_stars(&self, container: &ElementRef) -> Option<u8> {
        self.filled_star_selectors.iter().find_map(|selector| {
            let count = container.select(selector).count();
            (count > 0).then(|| u8::try_from(count.min(usize::from(Rating::MAX))).unwrap_or(Rating::MAX))
        })
    }

    fn from_aria_label(&self, container: &ElementRef) -> Option<u8> {
        let own_label = container.value().attr("aria-label");
        let nested_labels = self
            .rating_label_selectors
            .iter()
            .flat_map(|selector| container.select(selector))
            .filter_map(|element| element.value().attr("aria-label"));

        own_label
            .into_iter()
            .chain(nested_labels)
            .find_map(rating_from_label)
    }
}

/// Parse "N out of 5 stars"; fractional ratings are not review ratings
pub fn rating_from_label(label: &str) -> Option<u8> {
    let captures = OUT_OF_FIVE.captures(label)?;
    let value: f64 = captures[1].parse().ok()?;
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return None;
    }
    format!("{value:.0}").parse().ok()
}

/// Find a "N star" / "N-stars" token in visible text
pub fn rating_from_text(text: &str) -> Option<u8> {
    STAR_TOKEN
        .captures(text)
        .and_then(|captures| captures[1].parse().ok())
}

fn visible_text(element: &ElementRef) -> String {
    crate::domain::review::normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

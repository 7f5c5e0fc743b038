//! Selector configuration for review extraction
//!
//! Every field is an ordered list of fallbacks; the first selector that
//! produces a usable value wins.

use serde::{Deserialize, Serialize};

/// CSS selectors for review listing pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewListSelectors {
    /// Review container elements
    pub review_container: Vec<String>,

    /// Review body block inside a container
    pub content: Vec<String>,

    /// Filled star icons; their count is the first rating strategy
    pub filled_star: Vec<String>,

    /// Elements whose `aria-label` reads "N out of 5 stars"
    pub rating_label: Vec<String>,

    /// Reviewing merchant's store name
    pub store_name: Vec<String>,

    /// Elements holding the "Month D, YYYY" review date
    pub date: Vec<String>,

    /// Explicit country elements
    pub country: Vec<String>,

    /// Metadata lines scanned for a trailing "from <Country>"
    pub metadata: Vec<String>,

    /// Element carrying the listing's total review count
    pub review_count: Vec<String>,
}

impl Default for ReviewListSelectors {
    fn default() -> Self {
        Self {
            review_container: vec![
                "div[data-merchant-review]".to_string(),
                "div[data-review-content-id]".to_string(),
                ".review-listing".to_string(),
                "article.review".to_string(),
            ],
            content: vec![
                "[data-truncate-content-copy]".to_string(),
                "[data-truncate-review]".to_string(),
                ".review-content".to_string(),
                ".review-body".to_string(),
            ],
            filled_star: vec![
                "svg.tw-fill-fg-primary".to_string(),
                ".star-filled".to_string(),
                ".icon-star--filled".to_string(),
                "[data-star='filled']".to_string(),
            ],
            rating_label: vec![
                "[aria-label*='out of 5']".to_string(),
                "[aria-label*='stars']".to_string(),
            ],
            store_name: vec![
                "span.tw-text-heading-xs".to_string(),
                ".review-merchant-name".to_string(),
                "[data-merchant-name]".to_string(),
                "h3".to_string(),
                "h4".to_string(),
            ],
            date: vec![
                ".tw-text-body-xs.tw-text-fg-tertiary".to_string(),
                ".review-date".to_string(),
                "time".to_string(),
            ],
            country: vec![
                "[data-merchant-country]".to_string(),
                ".review-merchant-country".to_string(),
            ],
            metadata: vec![
                ".review-metadata".to_string(),
                ".review-merchant".to_string(),
                "[data-review-metadata]".to_string(),
            ],
            review_count: vec![
                "[data-review-count]".to_string(),
                ".reviews-summary-count".to_string(),
                "h2".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_default_fallbacks() {
        let selectors: ReviewListSelectors =
            serde_json::from_str(r#"{"store_name":[".merchant"]}"#).unwrap();
        assert_eq!(selectors.store_name, vec![".merchant".to_string()]);
        assert_eq!(selectors.content, ReviewListSelectors::default().content);
    }
}

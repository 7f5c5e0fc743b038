//! HTML parsing for review listing pages
//!
//! Trait-based extraction with ordered selector fallbacks. The extractor
//! turns one page of markup into typed `Review` records and never invents a
//! rating or a date.

pub mod config;
pub mod context;
pub mod date_normalizer;
pub mod error;
pub mod rating;
pub mod review_list_parser;

// Re-export public types
pub use config::ReviewListSelectors;
pub use context::ParseContext;
pub use date_normalizer::{find_long_date, normalize_review_date};
pub use error::{ParsingError, ParsingResult};
pub use rating::{RatingExtractor, RatingStrategy};
pub use review_list_parser::{PageExtraction, ReviewListParser};

use scraper::Html;

/// Parser trait with per-page context
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Validation trait for parsed results
pub trait Validator<T> {
    /// Validate parsed data for completeness and correctness
    fn validate(&self, data: &T) -> ParsingResult<()>;
}

//! Parsing error types for review extraction
//!
//! Every variant except `InvalidSelector` is scoped to a single review: the
//! extractor drops that record, logs it, and keeps going with the page.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in review")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Unparseable review date '{input}': {reason}")]
    DateParseFailure { input: String, reason: String },

    #[error("No star rating could be determined ({context})")]
    RatingNotFound { context: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    pub fn date_parse_failure(input: &str, reason: &str) -> Self {
        Self::DateParseFailure {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn rating_not_found(context: &str) -> Self {
        Self::RatingNotFound {
            context: context.to_string(),
        }
    }

    /// True when only the offending record is lost and the page can continue
    pub fn is_record_scoped(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. }
            | Self::DateParseFailure { .. }
            | Self::RatingNotFound { .. } => true,
            Self::InvalidSelector { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

//! Review date normalisation
//!
//! The listing renders dates only as "Month D, YYYY". Anything else is a
//! `DateParseFailure`; no placeholder date is ever substituted.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ParsingError, ParsingResult};
pub use crate::domain::review::EARLIEST_REVIEW_YEAR;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTH_PATTERN: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

static LONG_DATE_EXACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^({MONTH_PATTERN}) (\d{{1,2}}), ?(\d{{4}})$"))
        .expect("long date pattern is a valid regex")
});

static LONG_DATE_ANYWHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(?:{MONTH_PATTERN})\s+\d{{1,2}},\s*\d{{4}}\b"))
        .expect("long date pattern is a valid regex")
});

/// Locate the first "Month D, YYYY" token inside free text
pub fn find_long_date(text: &str) -> Option<&str> {
    LONG_DATE_ANYWHERE.find(text).map(|m| m.as_str())
}

/// Convert "August 11, 2025" into a calendar date
pub fn normalize_review_date(input: &str) -> ParsingResult<NaiveDate> {
    let collapsed = crate::domain::review::normalize_whitespace(input);
    if collapsed.is_empty() {
        return Err(ParsingError::date_parse_failure(input, "empty date text"));
    }

    let captures = LONG_DATE_EXACT
        .captures(&collapsed)
        .ok_or_else(|| ParsingError::date_parse_failure(input, "expected 'Month D, YYYY'"))?;

    let month = MONTHS
        .iter()
        .position(|name| *name == &captures[1])
        .and_then(|index| u32::try_from(index + 1).ok())
        .ok_or_else(|| ParsingError::date_parse_failure(input, "unknown month name"))?;
    let day: u32 = captures[2]
        .parse()
        .map_err(|_| ParsingError::date_parse_failure(input, "invalid day"))?;
    let year: i32 = captures[3]
        .parse()
        .map_err(|_| ParsingError::date_parse_failure(input, "invalid year"))?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ParsingError::date_parse_failure(input, "no such calendar day"))?;

    if !crate::domain::review::date_is_plausible(date) {
        return Err(ParsingError::date_parse_failure(
            input,
            "date predates the review listing",
        ));
    }

    Ok(date)
}

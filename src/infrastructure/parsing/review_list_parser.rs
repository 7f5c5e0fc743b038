//! Review list parser
//!
//! Extracts review records from one listing page with ordered fallback
//! strategies. Record-level failures (no rating, no date) drop only that
//! record; a page with zero records is a normal "no more content" result.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use super::config::ReviewListSelectors;
use super::date_normalizer::{find_long_date, normalize_review_date};
use super::rating::RatingExtractor;
use super::{ContextualParser, ParseContext, ParsingError, ParsingResult, Validator};
use crate::domain::review::{UNKNOWN_COUNTRY, UNKNOWN_STORE, normalize_whitespace};
use crate::domain::{Review, date_is_plausible};

static FROM_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[Ff]rom\s+").expect("from pattern is a valid regex"));

static COUNTRY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\p{Lu}[\p{L}.' -]*\p{L})\s*$").expect("country pattern is a valid regex")
});

static REVIEW_TOTAL_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)\s+reviews?\b").expect("review total pattern is a valid regex")
});

static JSON_LD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("JSON-LD selector is valid")
});

static ANY_DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("div selector is valid"));

/// Everything one page yielded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    /// Records that passed validation, in page order
    pub reviews: Vec<Review>,

    /// Containers dropped with the reason
    pub dropped: Vec<ParsingError>,

    /// Total review count advertised by the page, when present
    pub total_hint: Option<u32>,
}

impl PageExtraction {
    /// Zero valid records is the end-of-listing signal, not an error
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

/// Parser for Shopify App Store review listings
pub struct ReviewListParser {
    container_selectors: Vec<Selector>,
    content_selectors: Vec<Selector>,
    store_name_selectors: Vec<Selector>,
    date_selectors: Vec<Selector>,
    country_selectors: Vec<Selector>,
    metadata_selectors: Vec<Selector>,
    review_count_selectors: Vec<Selector>,
    rating: RatingExtractor,
}

impl ReviewListParser {
    /// Create a parser with the default selectors
    pub fn new() -> Result<Self> {
        Self::with_config(&ReviewListSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &ReviewListSelectors) -> Result<Self> {
        Ok(Self {
            container_selectors: Self::compile_selectors(&selectors.review_container)?,
            content_selectors: Self::compile_selectors(&selectors.content)?,
            store_name_selectors: Self::compile_selectors(&selectors.store_name)?,
            date_selectors: Self::compile_selectors(&selectors.date)?,
            country_selectors: Self::compile_selectors(&selectors.country)?,
            metadata_selectors: Self::compile_selectors(&selectors.metadata)?,
            review_count_selectors: Self::compile_selectors(&selectors.review_count)?,
            rating: RatingExtractor::new(
                Self::compile_selectors(&selectors.filled_star)?,
                Self::compile_selectors(&selectors.rating_label)?,
            ),
        })
    }

    /// Compile multiple selector strings into Selector objects
    fn compile_selectors(selector_strings: &[String]) -> Result<Vec<Selector>> {
        let mut selectors = Vec::new();
        let mut errors = Vec::new();

        for selector_str in selector_strings {
            match Selector::parse(selector_str) {
                Ok(selector) => selectors.push(selector),
                Err(e) => {
                    warn!("Failed to compile selector '{}': {}", selector_str, e);
                    errors.push(ParsingError::InvalidSelector {
                        selector: selector_str.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if selectors.is_empty() {
            let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(anyhow::anyhow!(
                "No valid selectors compiled from {:?}. Errors: {}",
                selector_strings,
                reasons.join(", ")
            ));
        }

        Ok(selectors)
    }

    /// Parse raw markup. `Html` is not `Send`, so callers in async code go
    /// through this and keep only the owned result.
    pub fn parse_page(&self, markup: &str, context: &ParseContext) -> ParsingResult<PageExtraction> {
        let html = Html::parse_document(markup);
        self.parse_with_context(&html, context)
    }

    /// Read the listing's advertised total review count.
    ///
    /// Only page metadata counts: JSON-LD, then the configured count elements
    /// outside any review container. Review text is never consulted.
    pub fn extract_total_review_count(&self, html: &Html) -> Option<u32> {
        Self::total_from_json_ld(html).or_else(|| self.total_from_count_elements(html))
    }

    fn total_from_json_ld(html: &Html) -> Option<u32> {
        html.select(&JSON_LD).find_map(|script| {
            let raw: String = script.text().collect();
            serde_json::from_str::<Value>(&raw)
                .ok()
                .and_then(|value| find_count_in_json(&value))
        })
    }

    fn total_from_count_elements(&self, html: &Html) -> Option<u32> {
        let containers = self.locate_containers(html);
        let in_review = |element: &ElementRef| {
            containers
                .iter()
                .any(|c| c.id() == element.id() || element.ancestors().any(|a| a.id() == c.id()))
        };

        self.review_count_selectors.iter().find_map(|selector| {
            html.select(selector).filter(|element| !in_review(element)).find_map(|element| {
                element
                    .value()
                    .attr("data-review-count")
                    .and_then(|raw| raw.trim().replace(',', "").parse().ok())
                    .or_else(|| parse_review_total(&element_text(&element)))
            })
        })
    }

    /// Containers from the first selector that matches anything with a
    /// content block; otherwise the innermost divs holding both a rating
    /// indicator and a content block.
    fn locate_containers<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        for (i, selector) in self.container_selectors.iter().enumerate() {
            let containers: Vec<ElementRef> = html
                .select(selector)
                .filter(|element| self.has_content_block(element))
                .collect();
            if !containers.is_empty() {
                debug!("Found {} review containers with container_selector_{}", containers.len(), i);
                return containers;
            }
        }

        let candidates: Vec<ElementRef> = html
            .select(&ANY_DIV)
            .filter(|element| self.has_content_block(element) && self.rating.has_indicator(element))
            .collect();
        let innermost: Vec<ElementRef> = candidates
            .iter()
            .filter(|element| {
                !candidates
                    .iter()
                    .any(|other| other.id() != element.id() && other.ancestors().any(|a| a.id() == element.id()))
            })
            .copied()
            .collect();

        if !innermost.is_empty() {
            debug!("Located {} review containers structurally", innermost.len());
        }
        innermost
    }

    fn has_content_block(&self, element: &ElementRef) -> bool {
        self.content_selectors
            .iter()
            .any(|selector| element.select(selector).next().is_some())
    }

    fn extract_review_from_element(
        &self,
        element: &ElementRef,
        index: usize,
        context: &ParseContext,
    ) -> ParsingResult<Review> {
        let location = format!("{context} review {index}");

        let (rating, strategy) = self
            .rating
            .extract(element)
            .ok_or_else(|| ParsingError::rating_not_found(&location))?;

        let review_date = self.extract_date(element, &location)?;

        let store_name = self
            .extract_text_with_fallbacks(element, &self.store_name_selectors)
            .unwrap_or_else(|| {
                warn!("No store name for {}, using '{}'", location, UNKNOWN_STORE);
                UNKNOWN_STORE.to_string()
            });
        let country_name = self.extract_country(element, &store_name);

        let review = Review {
            app_name: context.app_name.clone(),
            store_name,
            country_name,
            rating,
            review_content: self.extract_content(element),
            review_date,
        };

        debug!("Extracted {} ({:?}) at {}", review.dedup_key(), strategy, location);
        Ok(review)
    }

    /// First non-empty content block; an empty body is still a review
    fn extract_content(&self, element: &ElementRef) -> String {
        self.content_selectors
            .iter()
            .flat_map(|selector| element.select(selector))
            .map(|block| element_text(&block))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }

    fn extract_date(&self, element: &ElementRef, location: &str) -> ParsingResult<chrono::NaiveDate> {
        let from_selectors = self
            .date_selectors
            .iter()
            .flat_map(|selector| element.select(selector))
            .map(|node| element_text(&node))
            .find_map(|text| find_long_date(&text).map(ToString::to_string));

        let date_text = from_selectors
            .or_else(|| {
                // Fall back to any text node outside the review body
                let bodies = self.content_blocks(element);
                element
                    .descendants()
                    .filter(|node| !node.ancestors().any(|ancestor| bodies.iter().any(|b| b.id() == ancestor.id())))
                    .filter_map(|node| node.value().as_text())
                    .find_map(|text| find_long_date(&normalize_whitespace(text)).map(ToString::to_string))
            })
            .ok_or_else(|| ParsingError::date_parse_failure("", &format!("no 'Month D, YYYY' date at {location}")))?;

        normalize_review_date(&date_text)
    }

    /// Explicit country element, else a trailing "from <Country>" on a
    /// metadata line. Body text and the store name itself are never scanned.
    fn extract_country(&self, element: &ElementRef, store_name: &str) -> String {
        if let Some(country) = self.extract_text_with_fallbacks(element, &self.country_selectors) {
            return country;
        }

        let bodies = self.content_blocks(element);
        let stores: Vec<ElementRef> = self
            .store_name_selectors
            .iter()
            .flat_map(|selector| element.select(selector))
            .collect();
        let in_body = |meta: &ElementRef| {
            bodies
                .iter()
                .any(|b| b.id() == meta.id() || meta.ancestors().any(|a| a.id() == b.id()))
        };

        self.metadata_selectors
            .iter()
            .flat_map(|selector| element.select(selector))
            .filter(|meta| !in_body(meta))
            .flat_map(|meta| {
                meta.descendants()
                    .filter(|node| !node.ancestors().any(|a| stores.iter().any(|s| s.id() == a.id())))
                    .filter_map(|node| node.value().as_text().map(|text| normalize_whitespace(text)))
                    .collect::<Vec<_>>()
            })
            .find_map(|line| trailing_country(&line, store_name))
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
    }

    fn content_blocks<'a>(&self, element: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.content_selectors
            .iter()
            .flat_map(|selector| element.select(selector))
            .collect()
    }

    /// First non-empty, whitespace-collapsed text across the fallbacks
    fn extract_text_with_fallbacks(&self, element: &ElementRef, selectors: &[Selector]) -> Option<String> {
        selectors
            .iter()
            .flat_map(|selector| element.select(selector))
            .map(|node| element_text(&node))
            .find(|text| !text.is_empty())
    }
}

impl ContextualParser for ReviewListParser {
    type Output = PageExtraction;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!("Parsing review list for {} page {}", context.app_name, context.page_number);

        let mut extraction = PageExtraction {
            total_hint: self.extract_total_review_count(html),
            ..PageExtraction::default()
        };

        for (index, element) in self.locate_containers(html).iter().enumerate() {
            let outcome = self
                .extract_review_from_element(element, index, context)
                .and_then(|review| self.validate(&review).map(|()| review));

            match outcome {
                Ok(review) => extraction.reviews.push(review),
                Err(e) if e.is_record_scoped() => {
                    warn!("Dropping review {} on {}: {}", index, context, e);
                    extraction.dropped.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Extracted {} reviews ({} dropped) from {} page {}",
            extraction.reviews.len(),
            extraction.dropped.len(),
            context.app_name,
            context.page_number
        );

        Ok(extraction)
    }
}

impl Validator<Review> for ReviewListParser {
    fn validate(&self, review: &Review) -> ParsingResult<()> {
        if review.store_name.trim().is_empty() {
            return Err(ParsingError::required_field_missing("store_name", Some("review listing")));
        }
        if !date_is_plausible(review.review_date) {
            return Err(ParsingError::date_parse_failure(
                &review.review_date.to_string(),
                "placeholder date",
            ));
        }
        Ok(())
    }
}

fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// "Acme Co from Canada" -> "Canada". The store-name prefix is removed first
/// and only the last "from" counts, so "Made From Scratch" is not a country.
fn trailing_country(line: &str, store_name: &str) -> Option<String> {
    let line = line.trim();
    let line = if store_name.is_empty() || store_name == UNKNOWN_STORE {
        line
    } else {
        line.strip_prefix(store_name).unwrap_or(line)
    };
    let rest = &line[FROM_WORD.find_iter(line).last()?.end()..];
    COUNTRY_NAME.captures(rest).map(|c| c[1].to_string())
}

/// "1,234 reviews" -> 1234
fn parse_review_total(text: &str) -> Option<u32> {
    REVIEW_TOTAL_TEXT
        .captures(text)
        .and_then(|captures| captures[1].replace(',', "").parse().ok())
}

fn find_count_in_json(value: &Value) -> Option<u32> {
    match value {
        Value::Object(map) => ["reviewCount", "ratingCount"]
            .iter()
            .find_map(|key| map.get(*key).and_then(json_count))
            .or_else(|| map.values().find_map(find_count_in_json)),
        Value::Array(items) => items.iter().find_map(find_count_in_json),
        _ => None,
    }
}

fn json_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn parse(markup: &str) -> PageExtraction {
        let parser = ReviewListParser::new().unwrap();
        parser
            .parse_page(markup, &ParseContext::new("Acme Reviews", 1))
            .unwrap()
    }

    fn shopify_review(stars: usize, store: &str, date: &str, body: &str) -> String {
        let filled = "<svg class=\"tw-fill-fg-primary\"></svg>".repeat(stars);
        let empty = "<svg class=\"tw-fill-fg-tertiary\"></svg>".repeat(5 - stars);
        format!(
            r#"<div data-merchant-review="">
                 <div class="tw-flex">{filled}{empty}</div>
                 <div class="tw-text-body-xs tw-text-fg-tertiary">{date}</div>
                 <div data-truncate-content-copy=""><p>{body}</p></div>
                 <div class="review-merchant">
                   <span class="tw-text-heading-xs">{store}</span>
                   <div class="review-metadata">{store} from Canada</div>
                 </div>
               </div>"#
        )
    }

    #[test]
    fn extracts_shopify_markup() {
        let page = format!(
            "<html><body>{}{}</body></html>",
            shopify_review(5, "Acme Co", "August 11, 2025", "Works great"),
            shopify_review(2, "Widget  Barn", "July 2, 2025", "Support was   slow")
        );
        let extraction = parse(&page);

        assert_eq!(extraction.reviews.len(), 2);
        let first = &extraction.reviews[0];
        assert_eq!(first.app_name, "Acme Reviews");
        assert_eq!(first.store_name, "Acme Co");
        assert_eq!(first.rating.value(), 5);
        assert_eq!(first.country_name, "Canada");
        assert_eq!(first.review_content, "Works great");
        assert_eq!(first.review_date, NaiveDate::from_ymd_opt(2025, 8, 11).unwrap());

        let second = &extraction.reviews[1];
        assert_eq!(second.store_name, "Widget Barn");
        assert_eq!(second.review_content, "Support was slow");
        assert_eq!(second.rating.value(), 2);
    }

    #[test]
    fn bad_date_drops_only_that_record() {
        let page = format!(
            "<html><body>{}{}</body></html>",
            shopify_review(4, "Acme Co", "3 days ago", "Nice"),
            shopify_review(3, "Other Shop", "June 1, 2025", "Fine")
        );
        let extraction = parse(&page);

        assert_eq!(extraction.reviews.len(), 1);
        assert_eq!(extraction.reviews[0].store_name, "Other Shop");
        assert_eq!(extraction.dropped.len(), 1);
        assert!(matches!(extraction.dropped[0], ParsingError::DateParseFailure { .. }));
    }

    #[test]
    fn epoch_date_is_never_emitted() {
        let page = shopify_review(4, "Acme Co", "January 1, 1970", "Old");
        let extraction = parse(&page);
        assert!(extraction.reviews.is_empty());
        assert_eq!(extraction.dropped.len(), 1);
    }

    #[test]
    fn missing_store_name_falls_back_explicitly() {
        let page = r#"<div class="review-listing">
              <div aria-label="3 out of 5 stars"></div>
              <div class="review-date">May 4, 2024</div>
              <div class="review-content">Decent</div>
            </div>"#;
        let extraction = parse(page);
        assert_eq!(extraction.reviews.len(), 1);
        assert_eq!(extraction.reviews[0].store_name, UNKNOWN_STORE);
        assert_eq!(extraction.reviews[0].country_name, UNKNOWN_COUNTRY);
        assert_eq!(extraction.reviews[0].rating.value(), 3);
    }

    #[test]
    fn date_inside_body_is_not_the_review_date() {
        let page = r#"<article class="review">
              <span class="star-filled"></span>
              <h3>Body Date Shop</h3>
              <div class="review-body">Installed on January 5, 2024 and loved it</div>
              <p>Posted March 9, 2025</p>
            </article>"#;
        let extraction = parse(page);
        assert_eq!(extraction.reviews.len(), 1);
        assert_eq!(
            extraction.reviews[0].review_date,
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );
    }

    #[test]
    fn structural_fallback_finds_innermost_containers() {
        let page = r#"<html><body><div id="list">
              <div class="card">
                <span data-star="filled"></span><span data-star="filled"></span>
                <h4>Fallback Shop</h4>
                <div class="review-body">ok</div>
                <time>April 2, 2025</time>
              </div>
            </div></body></html>"#;
        let extraction = parse(page);
        assert_eq!(extraction.reviews.len(), 1);
        assert_eq!(extraction.reviews[0].store_name, "Fallback Shop");
        assert_eq!(extraction.reviews[0].rating.value(), 2);
    }

    #[test]
    fn empty_page_is_not_an_error() {
        let extraction = parse("<html><body><p>No reviews yet</p></body></html>");
        assert!(extraction.is_empty());
        assert!(extraction.dropped.is_empty());
    }

    #[test]
    fn total_review_count_sources() {
        let parser = ReviewListParser::new().unwrap();

        let json_ld = Html::parse_document(
            r#"<script type="application/ld+json">
                {"@type":"SoftwareApplication","aggregateRating":{"ratingValue":4.8,"reviewCount":"1,204"}}
               </script>"#,
        );
        assert_eq!(parser.extract_total_review_count(&json_ld), Some(1204));

        let attribute = Html::parse_document(r#"<span data-review-count="87">87</span>"#);
        assert_eq!(parser.extract_total_review_count(&attribute), Some(87));

        let heading = Html::parse_document("<h2>Reviews (2,315 reviews)</h2>");
        assert_eq!(parser.extract_total_review_count(&heading), Some(2315));

        let loose_text = Html::parse_document("<p>Rated 4.9 (2,315 reviews)</p>");
        assert_eq!(parser.extract_total_review_count(&loose_text), None);

        let none = Html::parse_document("<p>Be the first to review</p>");
        assert_eq!(parser.extract_total_review_count(&none), None);
    }

    #[test]
    fn review_text_never_sets_the_total() {
        let parser = ReviewListParser::new().unwrap();
        let page = Html::parse_document(&format!(
            "<html><body>{}</body></html>",
            shopify_review(5, "Acme Co", "August 11, 2025", "<h2>Compared 2 reviews</h2> I read 2 reviews first")
        ));

        assert_eq!(parser.extract_total_review_count(&page), None);
    }

    #[test]
    fn store_name_containing_from_is_not_a_country() {
        let without_country = r#"<div data-merchant-review="">
              <div aria-label="5 out of 5 stars"></div>
              <div class="tw-text-body-xs tw-text-fg-tertiary">July 1, 2025</div>
              <div data-truncate-content-copy=""><p>Tasty</p></div>
              <div class="review-merchant"><span class="tw-text-heading-xs">Made From Scratch</span></div>
            </div>"#;
        let review = &parse(without_country).reviews[0];
        assert_eq!(review.store_name, "Made From Scratch");
        assert_eq!(review.country_name, UNKNOWN_COUNTRY);

        let with_country = shopify_review(5, "Made From Scratch", "July 1, 2025", "Tasty");
        assert_eq!(parse(&with_country).reviews[0].country_name, "Canada");
    }

    #[rstest]
    #[case("Acme Co from Canada", "Acme Co", Some("Canada"))]
    #[case("Made From Scratch from United States", "Made From Scratch", Some("United States"))]
    #[case("Made From Scratch", "Made From Scratch", None)]
    #[case("Shipped from the warehouse", "Acme Co", None)]
    #[case("from Côte d'Ivoire", "Acme Co", Some("Côte d'Ivoire"))]
    fn trailing_country_cases(#[case] line: &str, #[case] store: &str, #[case] expected: Option<&str>) {
        assert_eq!(trailing_country(line, store).as_deref(), expected);
    }

    #[test]
    fn invalid_selectors_are_rejected_when_none_compile() {
        let selectors = ReviewListSelectors {
            content: vec!["div[".to_string()],
            ..ReviewListSelectors::default()
        };
        assert!(ReviewListParser::with_config(&selectors).is_err());
    }
}

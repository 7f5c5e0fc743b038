//! Parsing context for review extraction
//!
//! Carries the per-page facts the extractor cannot learn from the markup.

/// Context information for parsing one listing page
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Logical app name stamped onto every extracted review
    pub app_name: String,

    /// 1-based page number, for logging
    pub page_number: u32,

    /// URL the page was fetched from
    pub source_url: Option<String>,
}

impl ParseContext {
    /// Create new parse context
    pub fn new(app_name: impl Into<String>, page_number: u32) -> Self {
        Self {
            app_name: app_name.into(),
            page_number,
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

impl std::fmt::Display for ParseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} page {}", self.app_name, self.page_number)?;
        if let Some(url) = &self.source_url {
            write!(f, " ({url})")?;
        }
        Ok(())
    }
}

//! Registry of tracked apps
//!
//! Maps the stable logical app name used in storage to the App Store URL slug.
//! The registry is loaded from configuration and handed to the scrape service
//! at call time.

use serde::{Deserialize, Serialize};

/// When the pagination driver may stop early because it has seen every review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "total")]
pub enum TargetTotal {
    /// Only the empty streak or the page limit ends the run
    Unbounded,
    /// Stop once this many unique reviews have been extracted
    Fixed(u32),
    /// Adopt the review count advertised by the listing itself
    #[default]
    FromPage,
}

/// One app whose reviews are tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedApp {
    /// Logical name stored with every review
    pub app_name: String,
    /// App Store URL path segment
    pub slug: String,
    #[serde(default)]
    pub target: TargetTotal,
}

impl TrackedApp {
    pub fn new(app_name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            slug: slug.into(),
            target: TargetTotal::default(),
        }
    }

    pub fn with_target(mut self, target: TargetTotal) -> Self {
        self.target = target;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppRegistry {
    apps: Vec<TrackedApp>,
}

impl AppRegistry {
    pub fn new(apps: Vec<TrackedApp>) -> Self {
        Self { apps }
    }

    /// Look up an app by its logical name (case-insensitive)
    pub fn find(&self, app_name: &str) -> Option<&TrackedApp> {
        let wanted = app_name.trim();
        self.apps
            .iter()
            .find(|app| app.app_name.eq_ignore_ascii_case(wanted))
    }

    pub fn apps(&self) -> &[TrackedApp] {
        &self.apps
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }
}

impl From<Vec<TrackedApp>> for AppRegistry {
    fn from(apps: Vec<TrackedApp>) -> Self {
        Self::new(apps)
    }
}

//! Per-app scrape orchestration and run reporting
//!
//! Apps run one after another. A failure is scoped to its app: the report
//! records it and the next app still runs.

use serde::Serialize;
use tracing::{error, info};

use super::error::ScrapeError;
use super::pagination_driver::{PaginationDriver, PaginationRun, StopReason};
use crate::domain::{AppRegistry, TrackedApp};

/// Operator-facing result of one app's run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum ScrapeOutcome {
    NewReviews,
    /// The run completed but every record was already stored
    NothingNew,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AppScrapeReport {
    pub app_name: String,
    pub slug: String,
    pub pages_fetched: u32,
    pub records_found: usize,
    pub inserted: usize,
    pub duplicates_skipped: usize,
    pub records_dropped: usize,
    pub stop_reason: Option<StopReason>,
    pub outcome: ScrapeOutcome,
}

impl AppScrapeReport {
    fn from_run(app: &TrackedApp, run: PaginationRun) -> Self {
        let outcome = match (&run.failure, run.store.inserted) {
            (Some(failure), _) => ScrapeOutcome::Failed(failure.to_string()),
            (None, 0) => ScrapeOutcome::NothingNew,
            (None, _) => ScrapeOutcome::NewReviews,
        };

        Self {
            app_name: app.app_name.clone(),
            slug: app.slug.clone(),
            pages_fetched: run.pages_fetched,
            records_found: run.records_found,
            inserted: run.store.inserted,
            duplicates_skipped: run.store.duplicates,
            records_dropped: run.records_dropped + run.store.rejected,
            stop_reason: Some(run.stop_reason),
            outcome,
        }
    }

    fn aborted(app: &TrackedApp, error: &ScrapeError) -> Self {
        Self {
            app_name: app.app_name.clone(),
            slug: app.slug.clone(),
            pages_fetched: 0,
            records_found: 0,
            inserted: 0,
            duplicates_skipped: 0,
            records_dropped: 0,
            stop_reason: None,
            outcome: ScrapeOutcome::Failed(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ScrapeOutcome::Failed(_))
    }
}

impl std::fmt::Display for AppScrapeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match &self.outcome {
            ScrapeOutcome::NewReviews => "OK".to_string(),
            ScrapeOutcome::NothingNew => "NOTHING NEW".to_string(),
            ScrapeOutcome::Failed(reason) => format!("FAILED ({reason})"),
        };
        write!(
            f,
            "[{}] {}: pages={} found={} inserted={} duplicates={} dropped={}",
            status,
            self.app_name,
            self.pages_fetched,
            self.records_found,
            self.inserted,
            self.duplicates_skipped,
            self.records_dropped
        )?;
        if let Some(reason) = self.stop_reason {
            write!(f, " stop={reason}")?;
        }
        Ok(())
    }
}

pub struct ScrapeService {
    registry: AppRegistry,
    driver: PaginationDriver,
}

impl ScrapeService {
    pub fn new(registry: AppRegistry, driver: PaginationDriver) -> Self {
        Self { registry, driver }
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    /// Scrape every registered app in order
    pub async fn run_all(&self) -> Vec<AppScrapeReport> {
        let mut reports = Vec::with_capacity(self.registry.len());
        for app in self.registry.apps() {
            reports.push(self.scrape(app).await);
        }
        reports
    }

    /// Scrape one app by its logical name
    pub async fn run_app(&self, app_name: &str) -> Result<AppScrapeReport, ScrapeError> {
        let app = self
            .registry
            .find(app_name)
            .ok_or_else(|| ScrapeError::UnknownApp(app_name.to_string()))?;
        Ok(self.scrape(app).await)
    }

    async fn scrape(&self, app: &TrackedApp) -> AppScrapeReport {
        let report = match self.driver.run(app).await {
            Ok(run) => AppScrapeReport::from_run(app, run),
            Err(e) => {
                error!("{}: run aborted: {}", app.app_name, e);
                AppScrapeReport::aborted(app, &e)
            }
        };
        info!("{}", report);
        report
    }
}

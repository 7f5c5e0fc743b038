//! review-tracker: scrape Shopify App Store reviews into SQLite
//!
//! Exit code 0 when every run completed (including "nothing new"), 1 on a
//! configuration or database error or when any app's run was aborted.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use shopify_review_tracker::application::{
    AppScrapeReport, DeduplicatingStore, PaginationDriver, PaginationSettings, ScrapeService,
};
use shopify_review_tracker::infrastructure::{
    ConfigManager, DatabaseConnection, HttpClient, HttpClientConfig, ReviewListParser, SqliteReviewRepository,
    init_logging_with_config,
};

#[derive(Parser)]
#[command(name = "review-tracker")]
#[command(about = "Scrape Shopify App Store reviews for the tracked apps")]
#[command(version)]
struct Cli {
    /// Logical app name to scrape; every registered app when omitted
    app_name: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(reports) => {
            for report in &reports {
                println!("{report}");
            }
            if reports.iter().any(AppScrapeReport::is_failure) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("review-tracker: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Vec<AppScrapeReport>> {
    let config_manager = ConfigManager::new()?;
    let config = config_manager.initialize_on_first_run().await?;
    init_logging_with_config(config.logging.clone())?;

    let registry = config.registry();
    if registry.is_empty() {
        anyhow::bail!(
            "No apps registered; add entries under \"apps\" in {}",
            config_manager.config_path().display()
        );
    }

    let db = DatabaseConnection::from_config(&config.database).await?;
    db.migrate().await?;
    let repository = Arc::new(SqliteReviewRepository::new(db.pool().clone()));

    let fetcher = Arc::new(HttpClient::new(HttpClientConfig::from_scraper_config(&config.scraper))?);
    let parser = Arc::new(
        ReviewListParser::with_config(&config.scraper.selectors).context("Invalid selector configuration")?,
    );
    let driver = PaginationDriver::new(
        fetcher,
        parser,
        DeduplicatingStore::new(repository),
        PaginationSettings::from_scraper_config(&config.scraper),
    );
    let service = ScrapeService::new(registry, driver);

    let reports = match cli.app_name {
        Some(app_name) => vec![service.run_app(&app_name).await?],
        None => service.run_all().await,
    };

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    info!("Finished {} app(s), {} failed", reports.len(), failed);

    db.close().await;
    Ok(reports)
}

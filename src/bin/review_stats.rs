//! review-stats: print the dashboard statistics for one app as JSON
//!
//! `{"success":true,...}` on stdout and exit 0, or
//! `{"success":false,"error":"..."}` and exit 1.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use shopify_review_tracker::application::ReviewStatsService;
use shopify_review_tracker::infrastructure::{ConfigManager, DatabaseConnection, SqliteReviewRepository};

#[derive(Parser)]
#[command(name = "review-stats")]
#[command(about = "Print review counts for a tracked app as JSON")]
#[command(version)]
struct Cli {
    /// Logical app name of a registered app (case-insensitive)
    app_name: String,

    /// List the reviews of the last 30 days instead of the counts
    #[arg(long)]
    reviews: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", json!({ "success": false, "error": format!("{e:#}") }));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<serde_json::Value> {
    let app_name = cli.app_name.trim();
    if app_name.is_empty() {
        anyhow::bail!("app name must not be empty");
    }

    let config = ConfigManager::new()?.load_config().await?;
    let db = DatabaseConnection::from_config(&config.database).await?;
    db.migrate().await?;

    let service = ReviewStatsService::new(Arc::new(SqliteReviewRepository::new(db.pool().clone())))
        .with_registry(config.registry());
    let today = chrono::Utc::now().date_naive();

    let output = if cli.reviews {
        serde_json::to_value(service.recent_reviews(app_name, today).await?)?
    } else {
        serde_json::to_value(service.stats(app_name, today).await?)?
    };

    db.close().await;
    Ok(output)
}

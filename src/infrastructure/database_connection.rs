// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::infrastructure::config::{DatabaseConfig, defaults};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, defaults::DB_MAX_CONNECTIONS).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::with_max_connections(&config.url, config.max_connections).await
    }

    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        // Every in-memory connection is its own database, so keep exactly one alive
        let in_memory = is_in_memory(database_url);
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
                }
            }
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        info!("Database connected: {}", database_url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        // The UNIQUE constraint is what makes concurrent writers safe
        let create_reviews_sql = r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_name TEXT NOT NULL,
                store_name TEXT NOT NULL,
                country_name TEXT NOT NULL DEFAULT 'Unknown',
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                review_content TEXT NOT NULL DEFAULT '',
                review_date TEXT NOT NULL CHECK (review_date <> '1970-01-01'),
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (app_name, store_name, review_date, rating)
            )
        "#;

        let create_index_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_reviews_app_date ON reviews (app_name, review_date)
        "#;

        sqlx::query(create_reviews_sql)
            .execute(&self.pool)
            .await
            .context("Failed to create reviews table")?;
        sqlx::query(create_index_sql)
            .execute(&self.pool)
            .await
            .context("Failed to create reviews index")?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

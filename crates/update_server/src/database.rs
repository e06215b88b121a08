//! Database operations and connection management

use anyhow::{Context, Result};
use config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::time::Duration;

/// Database connection manager
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let filename = config.url.strip_prefix("sqlite:").unwrap_or(&config.url);
        let filename = filename.trim_start_matches("//");

        if let Some(parent) = std::path::Path::new(filename).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(filename)
                    .create_if_missing(true)
                    .journal_mode(if config.wal_mode {
                        SqliteJournalMode::Wal
                    } else {
                        SqliteJournalMode::Delete
                    }),
            )
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Create an in-memory database for testing
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self> {
        // A single long-lived connection, each new one would see an empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to create in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bundles (
                id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                channel TEXT NOT NULL DEFAULT 'production',
                target_app_version TEXT,
                fingerprint_hash TEXT,
                should_force_update INTEGER NOT NULL DEFAULT 0,
                enabled INTEGER NOT NULL DEFAULT 1,
                storage_uri TEXT NOT NULL,
                file_hash TEXT NOT NULL DEFAULT '',
                git_commit_hash TEXT,
                message TEXT,
                metadata TEXT,
                rollout_percentage INTEGER,
                target_device_ids TEXT,
                signature TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bundles table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS bundles_platform_channel_id ON bundles (platform, channel, id)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bundles index")?;

        Ok(())
    }

    /// Perform a health check on the database
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Close the database connection
    pub async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(db.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_database_migration() {
        let db = Database::new_in_memory().await.unwrap();
        // Idempotent
        db.migrate().await.unwrap();

        let result = sqlx::query("SELECT name FROM sqlite_master WHERE type IN ('table', 'index')")
            .fetch_all(db.pool())
            .await
            .unwrap();

        let names: Vec<String> = result
            .iter()
            .map(|row| sqlx::Row::get::<String, _>(row, "name"))
            .collect();

        assert!(names.contains(&"bundles".to_string()));
        assert!(names.contains(&"bundles_platform_channel_id".to_string()));
    }

    #[tokio::test]
    async fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite:{}", dir.path().join("nested/test.db").display()),
            ..DatabaseConfig::default()
        };

        let db = Database::new(&config).await.unwrap();
        db.migrate().await.unwrap();
        assert!(db.health_check().await.is_ok());
        db.close().await.unwrap();
    }
}

//! SQLite bundle store

use async_trait::async_trait;
use resolver::{BundleStore, CandidateQuery, TargetQuery};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use types::utils::parse_string_list;
use types::{Bundle, BundleId, Platform, Result, StoreError, UpdateStrategy};
use uuid::Uuid;

const BUNDLE_COLUMNS: &str = "id, platform, channel, target_app_version, fingerprint_hash, \
     should_force_update, enabled, storage_uri, file_hash, git_commit_hash, message, metadata, \
     rollout_percentage, target_device_ids, signature";

/// Default page size of the admin listing
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Filters for the admin bundle listing
#[derive(Debug, Clone, Default)]
pub struct BundleFilter {
    pub channel: Option<String>,
    pub platform: Option<Platform>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// [`BundleStore`] backed by the `bundles` table, plus the admin operations
#[derive(Debug, Clone)]
pub struct SqliteBundleStore {
    pool: Pool<Sqlite>,
}

impl SqliteBundleStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Newest-first page of bundles
    pub async fn list_bundles(&self, filter: &BundleFilter) -> std::result::Result<Vec<Bundle>, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM bundles WHERE 1 = 1", BUNDLE_COLUMNS));
        if let Some(channel) = &filter.channel {
            query.push(" AND channel = ").push_bind(channel.clone());
        }
        if let Some(platform) = filter.platform {
            query.push(" AND platform = ").push_bind(platform.as_str());
        }
        query
            .push(" ORDER BY id DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0))
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0).max(0));

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;
        rows.iter().map(bundle_from_row).collect()
    }

    pub async fn get_bundle(&self, id: BundleId) -> std::result::Result<Option<Bundle>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM bundles WHERE id = ?", BUNDLE_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;
        row.as_ref().map(bundle_from_row).transpose()
    }

    /// Insert bundles atomically; any duplicate id aborts the whole batch
    pub async fn insert_bundles(&self, bundles: &[Bundle]) -> std::result::Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(connection_failed)?;

        for bundle in bundles {
            let metadata = bundle
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(format!("unserializable metadata: {}", e)))?;
            let target_device_ids = bundle
                .target_device_ids
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| StoreError::QueryFailed(format!("unserializable device ids: {}", e)))?;

            sqlx::query(&format!(
                "INSERT INTO bundles ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                BUNDLE_COLUMNS
            ))
            .bind(bundle.id.to_string())
            .bind(bundle.platform.as_str())
            .bind(&bundle.channel)
            .bind(&bundle.target_app_version)
            .bind(&bundle.fingerprint_hash)
            .bind(bundle.should_force_update)
            .bind(bundle.enabled)
            .bind(&bundle.storage_uri)
            .bind(&bundle.file_hash)
            .bind(&bundle.git_commit_hash)
            .bind(&bundle.message)
            .bind(metadata)
            .bind(bundle.rollout_percentage)
            .bind(target_device_ids)
            .bind(&bundle.signature)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::ConstraintViolation(format!("bundle {} already exists", bundle.id))
                }
                _ => query_failed(e),
            })?;
        }

        tx.commit().await.map_err(query_failed)?;
        Ok(())
    }

    /// Flip the enabled flag and return the updated bundle
    pub async fn set_enabled(&self, id: BundleId, enabled: bool) -> std::result::Result<Bundle, StoreError> {
        let result = sqlx::query("UPDATE bundles SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound { id: id.to_string() });
        }
        self.get_bundle(id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound { id: id.to_string() })
    }

    pub async fn delete_bundle(&self, id: BundleId) -> std::result::Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM bundles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Delete every disabled bundle
    pub async fn prune_disabled(&self) -> std::result::Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM bundles WHERE enabled = 0")
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;
        Ok(result.rows_affected())
    }

    pub async fn list_channels(&self) -> std::result::Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT channel FROM bundles ORDER BY channel")
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("channel").map_err(query_failed))
            .collect()
    }
}

fn target_column(strategy: UpdateStrategy) -> &'static str {
    match strategy {
        UpdateStrategy::AppVersion => "target_app_version",
        UpdateStrategy::Fingerprint => "fingerprint_hash",
    }
}

fn query_failed(e: sqlx::Error) -> StoreError {
    StoreError::QueryFailed(e.to_string())
}

fn connection_failed(e: sqlx::Error) -> StoreError {
    StoreError::ConnectionFailed(e.to_string())
}

fn bundle_from_row(row: &SqliteRow) -> std::result::Result<Bundle, StoreError> {
    let id: String = row.try_get("id").map_err(query_failed)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| StoreError::QueryFailed(format!("corrupt bundle id {}: {}", id, e)))?;
    let platform: String = row.try_get("platform").map_err(query_failed)?;
    let platform = platform
        .parse::<Platform>()
        .map_err(|e| StoreError::QueryFailed(format!("bundle {}: {}", id, e)))?;

    let metadata = row
        .try_get::<Option<String>, _>("metadata")
        .map_err(query_failed)?
        .and_then(|raw| serde_json::from_str(&raw).ok());
    let target_device_ids = row
        .try_get::<Option<String>, _>("target_device_ids")
        .map_err(query_failed)?
        .and_then(|raw| parse_string_list(&raw));

    Ok(Bundle {
        id,
        platform,
        channel: row.try_get("channel").map_err(query_failed)?,
        target_app_version: row.try_get("target_app_version").map_err(query_failed)?,
        fingerprint_hash: row.try_get("fingerprint_hash").map_err(query_failed)?,
        should_force_update: row.try_get("should_force_update").map_err(query_failed)?,
        enabled: row.try_get("enabled").map_err(query_failed)?,
        storage_uri: row.try_get("storage_uri").map_err(query_failed)?,
        file_hash: row.try_get("file_hash").map_err(query_failed)?,
        git_commit_hash: row.try_get("git_commit_hash").map_err(query_failed)?,
        message: row.try_get("message").map_err(query_failed)?,
        metadata,
        rollout_percentage: row.try_get("rollout_percentage").map_err(query_failed)?,
        target_device_ids,
        signature: row.try_get("signature").map_err(query_failed)?,
    })
}

#[async_trait]
impl BundleStore for SqliteBundleStore {
    async fn list_distinct_targets(&self, query: &TargetQuery) -> Result<Vec<String>> {
        let column = target_column(query.strategy);
        let sql = format!(
            "SELECT DISTINCT {column} AS target FROM bundles \
             WHERE platform = ? AND channel = ? AND id >= ? AND {column} IS NOT NULL \
             ORDER BY target"
        );

        let rows = sqlx::query(&sql)
            .bind(query.platform.as_str())
            .bind(&query.channel)
            .bind(query.min_bundle_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;

        let targets = rows
            .iter()
            .map(|row| row.try_get::<String, _>("target").map_err(query_failed))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(targets.into_iter().filter(|t| !t.is_empty()).collect())
    }

    async fn find_candidate_bundles(&self, query: &CandidateQuery) -> Result<Vec<Bundle>> {
        if query.compatible_targets.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM bundles WHERE platform = ",
            BUNDLE_COLUMNS
        ));
        builder
            .push_bind(query.platform.as_str())
            .push(" AND channel = ")
            .push_bind(query.channel.clone())
            .push(" AND id >= ")
            .push_bind(query.min_bundle_id.to_string())
            .push(format!(" AND {} IN (", target_column(query.strategy)));
        let mut targets = builder.separated(", ");
        for target in &query.compatible_targets {
            targets.push_bind(target.clone());
        }
        builder.push(") ORDER BY id DESC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;
        Ok(rows
            .iter()
            .map(bundle_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

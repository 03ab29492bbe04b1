//! MySQL cache repository implementation.

use super::like_prefix_pattern;
use crate::traits::CacheRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{CacheEntry, CacheKey, InvalidationScope, PulseError, PulseResult};
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlPool;
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::debug;

/// MySQL cache repository implementation.
#[derive(Clone)]
pub struct MySqlCacheRepository {
    pool: MySqlPool,
}

impl MySqlCacheRepository {
    /// Creates a new MySQL cache repository.
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a cache entry.
#[derive(Debug, FromRow)]
struct CacheEntryRow {
    cache_key: String,
    payload: Json<JsonValue>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CacheEntryRow> for CacheEntry {
    type Error = PulseError;

    fn try_from(row: CacheEntryRow) -> Result<Self, Self::Error> {
        let key = CacheKey::new(row.cache_key)
            .map_err(|e| PulseError::internal(format!("Invalid cache key in database: {}", e)))?;

        Ok(CacheEntry {
            key,
            payload: row.payload.0,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CacheRepository for MySqlCacheRepository {
    async fn find_entry(&self, key: &CacheKey) -> PulseResult<Option<CacheEntry>> {
        debug!("Finding cache entry: {}", key);

        let row = sqlx::query_as::<_, CacheEntryRow>(
            r#"
            SELECT cache_key, payload, updated_at, expires_at, created_at
            FROM cache_entries
            WHERE cache_key = ?
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    async fn upsert(&self, entry: &CacheEntry) -> PulseResult<()> {
        debug!("Writing cache entry: {}", entry.key);

        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_key, payload, updated_at, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                payload = VALUES(payload),
                updated_at = VALUES(updated_at),
                expires_at = VALUES(expires_at)
            "#,
        )
        .bind(entry.key.as_str())
        .bind(Json(&entry.payload))
        .bind(entry.updated_at)
        .bind(entry.expires_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_matching(&self, scope: &InvalidationScope) -> PulseResult<u64> {
        debug!("Deleting cache entries in scope {}", scope);

        let result = match scope {
            InvalidationScope::Exact(key) => {
                sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?")
                    .bind(key.as_str())
                    .execute(&self.pool)
                    .await?
            }
            InvalidationScope::Prefix(prefix) => {
                sqlx::query("DELETE FROM cache_entries WHERE cache_key LIKE ? ESCAPE '!'")
                    .bind(like_prefix_pattern(prefix))
                    .execute(&self.pool)
                    .await?
            }
            InvalidationScope::All => {
                sqlx::query("DELETE FROM cache_entries")
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> PulseResult<u64> {
        debug!("Deleting cache entries expired at {}", now);

        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> PulseResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

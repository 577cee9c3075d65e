// SQLite-backed rate limit events.
//
// One row per consumed action. `try_consume` is a single conditional
// INSERT so the count check and the write cannot interleave with another
// request for the same actor.

use crate::core::rate_limit::{RateLimitError, RateLimitStore};
use crate::infra::sqlite_support::encode_ts;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

pub struct SqliteRateLimitStore {
    pool: Pool<Sqlite>,
}

impl SqliteRateLimitStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), RateLimitError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rate_limit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor_id TEXT NOT NULL,
                action_type TEXT NOT NULL,
                occurred_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rate_limit_events_key
                ON rate_limit_events(actor_id, action_type, occurred_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RateLimitError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for SqliteRateLimitStore {
    async fn count_since(
        &self,
        actor_id: Uuid,
        action_type: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, RateLimitError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count FROM rate_limit_events
            WHERE actor_id = ? AND action_type = ? AND occurred_at >= ?
            "#,
        )
        .bind(actor_id.to_string())
        .bind(action_type)
        .bind(encode_ts(since))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RateLimitError::StorageError(e.to_string()))?;

        Ok(row.get::<i64, _>("count") as u32)
    }

    async fn record(
        &self,
        actor_id: Uuid,
        action_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        sqlx::query(
            "INSERT INTO rate_limit_events (actor_id, action_type, occurred_at) VALUES (?, ?, ?)",
        )
        .bind(actor_id.to_string())
        .bind(action_type)
        .bind(encode_ts(at))
        .execute(&self.pool)
        .await
        .map_err(|e| RateLimitError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn try_consume(
        &self,
        actor_id: Uuid,
        action_type: &str,
        since: DateTime<Utc>,
        max_actions: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, RateLimitError> {
        let actor = actor_id.to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO rate_limit_events (actor_id, action_type, occurred_at)
            SELECT ?, ?, ?
            WHERE (
                SELECT COUNT(*) FROM rate_limit_events
                WHERE actor_id = ? AND action_type = ? AND occurred_at >= ?
            ) < ?
            "#,
        )
        .bind(&actor)
        .bind(action_type)
        .bind(encode_ts(at))
        .bind(&actor)
        .bind(action_type)
        .bind(encode_ts(since))
        .bind(max_actions as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RateLimitError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_one(
        &self,
        actor_id: Uuid,
        action_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        sqlx::query(
            r#"
            DELETE FROM rate_limit_events
            WHERE id = (
                SELECT id FROM rate_limit_events
                WHERE actor_id = ? AND action_type = ? AND occurred_at = ?
                ORDER BY id DESC
                LIMIT 1
            )
            "#,
        )
        .bind(actor_id.to_string())
        .bind(action_type)
        .bind(encode_ts(at))
        .execute(&self.pool)
        .await
        .map_err(|e| RateLimitError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, RateLimitError> {
        let result = sqlx::query("DELETE FROM rate_limit_events WHERE occurred_at < ?")
            .bind(encode_ts(older_than))
            .execute(&self.pool)
            .await
            .map_err(|e| RateLimitError::StorageError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

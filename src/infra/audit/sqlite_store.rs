// SQLite-backed audit log. Append-only: there is no UPDATE or DELETE path.

use crate::core::audit::{AdminLog, AuditError, AuditStore};
use crate::infra::sqlite_support::{decode_opt_uuid, decode_ts, decode_uuid, encode_ts};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::net::IpAddr;

pub struct SqliteAuditStore {
    pool: Pool<Sqlite>,
}

impl SqliteAuditStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_logs (
                id TEXT PRIMARY KEY,
                admin_id TEXT NOT NULL,
                action_type TEXT NOT NULL,
                target_type TEXT NOT NULL,
                target_id TEXT,
                old_value TEXT,
                new_value TEXT,
                reason TEXT,
                ip_address TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_admin_logs_created
                ON admin_logs(created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(())
    }
}

fn json_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

fn row_to_log(row: &SqliteRow) -> Result<AdminLog, String> {
    let parse_json = |column: &str| -> Result<Option<serde_json::Value>, String> {
        row.get::<Option<String>, _>(column)
            .map(|raw| serde_json::from_str(&raw).map_err(|e| format!("bad {column}: {e}")))
            .transpose()
    };

    Ok(AdminLog {
        id: decode_uuid(&row.get::<String, _>("id"))?,
        admin_id: decode_uuid(&row.get::<String, _>("admin_id"))?,
        action_type: row.get("action_type"),
        target_type: row.get("target_type"),
        target_id: decode_opt_uuid(row.get("target_id"))?,
        old_value: parse_json("old_value")?,
        new_value: parse_json("new_value")?,
        reason: row.get("reason"),
        ip_address: row
            .get::<Option<String>, _>("ip_address")
            .map(|raw| raw.parse::<IpAddr>().map_err(|e| format!("bad ip_address: {e}")))
            .transpose()?,
        created_at: decode_ts(&row.get::<String, _>("created_at"))?,
    })
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, entry: &AdminLog) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO admin_logs (
                id, admin_id, action_type, target_type, target_id,
                old_value, new_value, reason, ip_address, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.admin_id.to_string())
        .bind(&entry.action_type)
        .bind(&entry.target_type)
        .bind(entry.target_id.map(|id| id.to_string()))
        .bind(json_text(&entry.old_value))
        .bind(json_text(&entry.new_value))
        .bind(&entry.reason)
        .bind(entry.ip_address.map(|ip| ip.to_string()))
        .bind(encode_ts(entry.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn list(
        &self,
        limit: usize,
        action_type: Option<&str>,
    ) -> Result<Vec<AdminLog>, AuditError> {
        let rows = match action_type {
            Some(action_type) => {
                sqlx::query(
                    "SELECT * FROM admin_logs WHERE action_type = ? \
                     ORDER BY created_at DESC, rowid DESC LIMIT ?",
                )
                .bind(action_type)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM admin_logs ORDER BY created_at DESC, rowid DESC LIMIT ?")
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| AuditError::StorageError(e.to_string()))?;

        rows.iter()
            .map(|row| row_to_log(row).map_err(AuditError::StorageError))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite_support::connect;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    async fn test_store() -> (SqliteAuditStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(dir.path().join("audit.db").to_str().unwrap())
            .await
            .unwrap();
        let store = SqliteAuditStore::new(pool);
        store.migrate().await.unwrap();
        (store, dir)
    }

    fn entry(action_type: &str, minute: i64) -> AdminLog {
        AdminLog {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            action_type: action_type.to_string(),
            target_type: "content_flag".to_string(),
            target_id: Some(Uuid::new_v4()),
            old_value: Some(json!({ "status": "pending" })),
            new_value: Some(json!({ "status": "dismissed", "notes": null })),
            reason: None,
            ip_address: Some("203.0.113.7".parse().unwrap()),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minute),
        }
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let (store, _dir) = test_store().await;
        let log = entry("review_flag", 0);

        store.append(&log).await.unwrap();

        assert_eq!(store.list(10, None).await.unwrap(), vec![log]);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let (store, _dir) = test_store().await;
        let old = entry("review_flag", 0);
        let mid = entry("delete_content", 5);
        let new = entry("review_flag", 10);
        for log in [&mid, &new, &old] {
            store.append(log).await.unwrap();
        }

        let ids: Vec<Uuid> = store
            .list(10, None)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![new.id, mid.id, old.id]);

        let reviews = store.list(10, Some("review_flag")).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|l| l.action_type == "review_flag"));

        assert_eq!(store.list(1, None).await.unwrap()[0].id, new.id);
    }
}

// SQLite-backed moderation store.
//
// Tables:
// - content_flags: Units of moderation work (never deleted)
// - user_reports: Human reports, each linked to the flag it spawned
// - pending_dispositions: Outbox for content deletions awaiting their disposition

use crate::core::moderation::{
    ContentFlag, ContentType, ModerationError, ModerationStatus, ModerationStore,
    PendingDisposition, Review, UserReport,
};
use crate::infra::sqlite_support::{decode_opt_uuid, decode_ts, decode_uuid, encode_ts};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_flags (
                id TEXT PRIMARY KEY,
                post_id TEXT,
                comment_id TEXT,
                flagged_user_id TEXT,
                flagged_by TEXT,
                source TEXT NOT NULL,
                reason TEXT NOT NULL,
                description TEXT,
                ai_category TEXT,
                ai_confidence REAL,
                urgency_level INTEGER,
                status TEXT NOT NULL DEFAULT 'pending',
                reviewed_by TEXT,
                reviewed_at TEXT,
                action_taken TEXT,
                action_notes TEXT,
                created_at TEXT NOT NULL,
                CHECK (post_id IS NOT NULL OR comment_id IS NOT NULL OR flagged_user_id IS NOT NULL)
            );
            CREATE INDEX IF NOT EXISTS idx_content_flags_queue
                ON content_flags(status, urgency_level, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_reports (
                id TEXT PRIMARY KEY,
                reporter_id TEXT NOT NULL,
                reported_user_id TEXT,
                reported_post_id TEXT,
                reported_comment_id TEXT,
                reason TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                content_flag_id TEXT REFERENCES content_flags(id),
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_reports_flag
                ON user_reports(content_flag_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_dispositions (
                flag_id TEXT PRIMARY KEY,
                content_type TEXT NOT NULL,
                content_id TEXT NOT NULL,
                reviewer_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

fn storage(e: sqlx::Error) -> ModerationError {
    ModerationError::StorageError(e.to_string())
}

fn corrupt(msg: String) -> ModerationError {
    ModerationError::StorageError(format!("corrupt row: {msg}"))
}

fn insert_flag_query(
    flag: &ContentFlag,
) -> sqlx::query::Query<'static, Sqlite, SqliteArguments<'static>> {
    sqlx::query(
        r#"
        INSERT INTO content_flags (
            id, post_id, comment_id, flagged_user_id, flagged_by, source, reason,
            description, ai_category, ai_confidence, urgency_level, status,
            reviewed_by, reviewed_at, action_taken, action_notes, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(flag.id.to_string())
    .bind(flag.post_id.map(|id| id.to_string()))
    .bind(flag.comment_id.map(|id| id.to_string()))
    .bind(flag.flagged_user_id.map(|id| id.to_string()))
    .bind(flag.flagged_by.map(|id| id.to_string()))
    .bind(flag.source.as_str())
    .bind(flag.reason.as_str())
    .bind(flag.description.clone())
    .bind(flag.ai_category.clone())
    .bind(flag.ai_confidence)
    .bind(flag.urgency_level)
    .bind(flag.status.as_str())
    .bind(flag.reviewed_by.map(|id| id.to_string()))
    .bind(flag.reviewed_at.map(encode_ts))
    .bind(flag.action_taken.clone())
    .bind(flag.action_notes.clone())
    .bind(encode_ts(flag.created_at))
}

fn parse_vocab<T: FromStr<Err = ModerationError>>(raw: String) -> Result<T, String> {
    raw.parse().map_err(|e: ModerationError| e.to_string())
}

fn row_to_flag(row: &SqliteRow) -> Result<ContentFlag, String> {
    Ok(ContentFlag {
        id: decode_uuid(&row.get::<String, _>("id"))?,
        post_id: decode_opt_uuid(row.get("post_id"))?,
        comment_id: decode_opt_uuid(row.get("comment_id"))?,
        flagged_user_id: decode_opt_uuid(row.get("flagged_user_id"))?,
        flagged_by: decode_opt_uuid(row.get("flagged_by"))?,
        source: parse_vocab(row.get("source"))?,
        reason: parse_vocab(row.get("reason"))?,
        description: row.get("description"),
        ai_category: row.get("ai_category"),
        ai_confidence: row.get("ai_confidence"),
        urgency_level: row.get("urgency_level"),
        status: parse_vocab(row.get("status"))?,
        reviewed_by: decode_opt_uuid(row.get("reviewed_by"))?,
        reviewed_at: row
            .get::<Option<String>, _>("reviewed_at")
            .as_deref()
            .map(decode_ts)
            .transpose()?,
        action_taken: row.get("action_taken"),
        action_notes: row.get("action_notes"),
        created_at: decode_ts(&row.get::<String, _>("created_at"))?,
    })
}

fn row_to_report(row: &SqliteRow) -> Result<UserReport, String> {
    Ok(UserReport {
        id: decode_uuid(&row.get::<String, _>("id"))?,
        reporter_id: decode_uuid(&row.get::<String, _>("reporter_id"))?,
        reported_user_id: decode_opt_uuid(row.get("reported_user_id"))?,
        reported_post_id: decode_opt_uuid(row.get("reported_post_id"))?,
        reported_comment_id: decode_opt_uuid(row.get("reported_comment_id"))?,
        reason: parse_vocab(row.get("reason"))?,
        description: row.get("description"),
        status: parse_vocab(row.get("status"))?,
        content_flag_id: decode_opt_uuid(row.get("content_flag_id"))?,
        created_at: decode_ts(&row.get::<String, _>("created_at"))?,
    })
}

fn row_to_pending(row: &SqliteRow) -> Result<PendingDisposition, String> {
    Ok(PendingDisposition {
        flag_id: decode_uuid(&row.get::<String, _>("flag_id"))?,
        content_type: parse_vocab::<ContentType>(row.get("content_type"))?,
        content_id: decode_uuid(&row.get::<String, _>("content_id"))?,
        reviewer_id: decode_uuid(&row.get::<String, _>("reviewer_id"))?,
        created_at: decode_ts(&row.get::<String, _>("created_at"))?,
    })
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn insert_report_with_flag(
        &self,
        report: &UserReport,
        flag: &ContentFlag,
    ) -> Result<(), ModerationError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        insert_flag_query(flag)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO user_reports (
                id, reporter_id, reported_user_id, reported_post_id, reported_comment_id,
                reason, description, status, content_flag_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.id.to_string())
        .bind(report.reporter_id.to_string())
        .bind(report.reported_user_id.map(|id| id.to_string()))
        .bind(report.reported_post_id.map(|id| id.to_string()))
        .bind(report.reported_comment_id.map(|id| id.to_string()))
        .bind(report.reason.as_str())
        .bind(&report.description)
        .bind(report.status.as_str())
        .bind(report.content_flag_id.map(|id| id.to_string()))
        .bind(encode_ts(report.created_at))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn insert_flag(&self, flag: &ContentFlag) -> Result<(), ModerationError> {
        insert_flag_query(flag)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn get_flag(&self, id: Uuid) -> Result<Option<ContentFlag>, ModerationError> {
        let row = sqlx::query("SELECT * FROM content_flags WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(row_to_flag).transpose().map_err(corrupt)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<UserReport>, ModerationError> {
        let row = sqlx::query("SELECT * FROM user_reports WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(row_to_report).transpose().map_err(corrupt)
    }

    async fn list_flags(
        &self,
        status: Option<ModerationStatus>,
        limit: usize,
    ) -> Result<Vec<ContentFlag>, ModerationError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT * FROM content_flags
                    WHERE status = ?
                    ORDER BY urgency_level IS NULL, urgency_level DESC, created_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(status.as_str())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM content_flags
                    ORDER BY urgency_level IS NULL, urgency_level DESC, created_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(storage)?;

        let mut flags = Vec::with_capacity(rows.len());
        for row in rows {
            match row_to_flag(&row) {
                Ok(flag) => flags.push(flag),
                Err(e) => {
                    let id: String = row.get("id");
                    tracing::warn!(flag_id = %id, error = %e, "Skipping undecodable flag row");
                }
            }
        }
        Ok(flags)
    }

    async fn count_flags_by_status(&self) -> Result<Vec<(String, u64)>, ModerationError> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) AS count FROM content_flags GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(storage)?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<String, _>("status"),
                    row.get::<i64, _>("count") as u64,
                )
            })
            .collect())
    }

    async fn apply_review(
        &self,
        flag_id: Uuid,
        review: &Review,
    ) -> Result<ContentFlag, ModerationError> {
        let id = flag_id.to_string();
        let status = review.decision.status();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let result = sqlx::query(
            r#"
            UPDATE content_flags SET
                status = ?,
                reviewed_by = ?,
                reviewed_at = ?,
                action_notes = ?,
                action_taken = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(review.reviewer_id.to_string())
        .bind(encode_ts(review.reviewed_at))
        .bind(&review.notes)
        .bind(&review.action_taken)
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            // Nothing written; dropping the transaction rolls it back
            let exists = sqlx::query("SELECT 1 FROM content_flags WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage)?;
            return Err(match exists {
                Some(_) => ModerationError::AlreadyReviewed(flag_id),
                None => ModerationError::flag_not_found(flag_id),
            });
        }

        sqlx::query("UPDATE user_reports SET status = ? WHERE content_flag_id = ?")
            .bind(status.as_str())
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let row = sqlx::query("SELECT * FROM content_flags WHERE id = ?")
            .bind(&id)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;
        let flag = row_to_flag(&row).map_err(corrupt)?;

        tx.commit().await.map_err(storage)?;
        Ok(flag)
    }

    async fn set_report_status(
        &self,
        report_id: Uuid,
        status: ModerationStatus,
    ) -> Result<(ModerationStatus, UserReport), ModerationError> {
        let id = report_id.to_string();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query("SELECT * FROM user_reports WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?
            .ok_or_else(|| ModerationError::report_not_found(report_id))?;
        let mut report = row_to_report(&row).map_err(corrupt)?;

        sqlx::query("UPDATE user_reports SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        let previous = report.status;
        report.status = status;
        Ok((previous, report))
    }

    async fn save_pending_disposition(
        &self,
        pending: &PendingDisposition,
    ) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO pending_dispositions
                (flag_id, content_type, content_id, reviewer_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(pending.flag_id.to_string())
        .bind(pending.content_type.as_str())
        .bind(pending.content_id.to_string())
        .bind(pending.reviewer_id.to_string())
        .bind(encode_ts(pending.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ModerationError::DispositionInProgress(pending.flag_id)
            }
            _ => storage(e),
        })?;
        Ok(())
    }

    async fn remove_pending_disposition(&self, flag_id: Uuid) -> Result<(), ModerationError> {
        sqlx::query("DELETE FROM pending_dispositions WHERE flag_id = ?")
            .bind(flag_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn list_pending_dispositions(&self) -> Result<Vec<PendingDisposition>, ModerationError> {
        let rows = sqlx::query("SELECT * FROM pending_dispositions ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter()
            .map(|row| row_to_pending(row).map_err(corrupt))
            .collect()
    }
}

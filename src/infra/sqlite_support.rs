// Shared SQLite plumbing for the moderation stores.
//
// Ids are stored as hyphenated UUID text. Timestamps are stored as
// fixed-width RFC 3339 text (microseconds, `Z` suffix) so that string
// comparison and `ORDER BY` agree with chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use uuid::Uuid;

/// Open (creating if needed) the SQLite database at `database_url`.
///
/// Accepts a bare file path or a `sqlite:` URL.
pub async fn connect(database_url: &str) -> anyhow::Result<Pool<Sqlite>> {
    let path_str = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path_str = path_str.split('?').next().unwrap_or(path_str);

    if !path_str.contains(":memory:") {
        if let Some(parent) = Path::new(path_str).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let conn_str = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}?mode=rwc", database_url)
    };

    let pool = SqlitePoolOptions::new().connect(&conn_str).await?;
    Ok(pool)
}

pub fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_ts(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {raw:?}: {e}"))
}

pub fn decode_uuid(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|e| format!("bad id {raw:?}: {e}"))
}

pub fn decode_opt_uuid(raw: Option<String>) -> Result<Option<Uuid>, String> {
    raw.as_deref().map(decode_uuid).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_are_fixed_width_and_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::microseconds(1500);

        let a = encode_ts(early);
        let b = encode_ts(late);
        assert_eq!(a, "2024-01-02T03:04:05.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(decode_ts(&b).unwrap(), late);
    }

    #[test]
    fn test_decode_errors_are_reported() {
        assert!(decode_ts("yesterday").is_err());
        assert!(decode_uuid("not-a-uuid").is_err());
        assert_eq!(decode_opt_uuid(None).unwrap(), None);
    }

    #[tokio::test]
    async fn test_connect_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("moderation.db");

        let pool = connect(path.to_str().unwrap()).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        assert!(path.exists());
    }
}

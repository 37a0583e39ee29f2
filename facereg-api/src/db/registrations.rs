//! Encoding record persistence
//!
//! Insert and full-table reads only. Records are never updated or deleted,
//! and names are not unique.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use facereg_common::api::UserEncoding;
use facereg_common::EncodingRecord;
use sqlx::{Row, SqlitePool};

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn parse_encoding(raw: &str) -> Result<Vec<f64>, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Append a new record stamped with the current time
pub async fn insert(
    pool: &SqlitePool,
    name: &str,
    encoding: &[f64],
) -> Result<EncodingRecord, sqlx::Error> {
    // Truncate to the stored precision so the returned record equals a re-read
    let registered_at = Utc::now().trunc_subsecs(6);
    let encoding_json =
        serde_json::to_string(encoding).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let id = sqlx::query(
        "INSERT INTO face_registrations (name, encoding, registered_at) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(&encoding_json)
    .bind(format_timestamp(&registered_at))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(EncodingRecord {
        id,
        name: name.to_string(),
        encoding: encoding.to_vec(),
        registered_at,
    })
}

/// All records, newest first (ties broken by insertion order, newest first)
pub async fn list_newest_first(pool: &SqlitePool) -> Result<Vec<EncodingRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, encoding, registered_at
        FROM face_registrations
        ORDER BY registered_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(EncodingRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                encoding: parse_encoding(row.try_get::<&str, _>("encoding")?)?,
                registered_at: parse_timestamp(row.try_get::<&str, _>("registered_at")?)?,
            })
        })
        .collect()
}

/// `{name, encoding}` for every record, in insertion order
pub async fn export_all(pool: &SqlitePool) -> Result<Vec<UserEncoding>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT name, encoding FROM face_registrations ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(name, encoding)| {
            Ok(UserEncoding {
                name,
                encoding: parse_encoding(&encoding)?,
            })
        })
        .collect()
}

//! Stored franchise applications
//!
//! The full record lives in the `document` column as JSON; the indexed
//! columns duplicate the fields that listing and stats need.

use chrono::SecondsFormat;
use intake_common::model::{ApplicationStats, Submission};
use intake_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Insert a new application
pub async fn insert_application(pool: &SqlitePool, submission: &Submission) -> Result<()> {
    let document = serde_json::to_string(submission)?;

    sqlx::query(
        r#"
        INSERT INTO applications (
            id, full_name, email, mobile_number, target_city, status,
            document, submitted_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission.id.to_string())
    .bind(&submission.full_name)
    .bind(&submission.email)
    .bind(&submission.mobile_number)
    .bind(submission.target_city.as_deref())
    .bind(submission.status.as_str())
    .bind(document)
    .bind(submission.submitted_at.to_rfc3339_opts(SecondsFormat::Micros, true))
    .bind(submission.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
    .bind(submission.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true))
    .execute(pool)
    .await?;

    Ok(())
}

/// All applications, newest first
pub async fn list_applications(pool: &SqlitePool) -> Result<Vec<Submission>> {
    let rows = sqlx::query("SELECT document FROM applications ORDER BY created_at DESC, rowid DESC")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| -> Result<Submission> {
            let document: String = row.get("document");
            Ok(serde_json::from_str(&document)?)
        })
        .collect()
}

/// One application by id
pub async fn load_application(pool: &SqlitePool, id: Uuid) -> Result<Option<Submission>> {
    let row = sqlx::query("SELECT document FROM applications WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let document: String = row.get("document");
            Ok(Some(serde_json::from_str(&document)?))
        }
        None => Ok(None),
    }
}

/// Totals per status and the number of distinct target cities
pub async fn application_stats(pool: &SqlitePool) -> Result<ApplicationStats> {
    let by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM applications GROUP BY status")
            .fetch_all(pool)
            .await?;

    let cities: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT target_city) FROM applications
        WHERE target_city IS NOT NULL AND target_city != ''
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(ApplicationStats::from_counts(by_status, cities))
}

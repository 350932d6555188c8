//! Database operations for `capture_runs` and `capture_run_platforms`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `capture_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CaptureRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Items stored across all platforms of the run.
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `capture_run_platforms` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CaptureRunPlatformRow {
    pub id: i64,
    pub capture_run_id: i64,
    pub platform: String,
    pub status: String,
    pub records_processed: i32,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub snapshot_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Per-platform result recorded against a capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOutcome {
    pub platform: String,
    pub succeeded: bool,
    pub records_processed: i32,
    pub duration_ms: i64,
    pub error_message: Option<String>,
    pub snapshot_id: Option<i64>,
}

impl PlatformOutcome {
    #[must_use]
    pub fn succeeded(
        platform: impl Into<String>,
        records_processed: i32,
        duration_ms: i64,
        snapshot_id: i64,
    ) -> Self {
        Self {
            platform: platform.into(),
            succeeded: true,
            records_processed,
            duration_ms,
            error_message: None,
            snapshot_id: Some(snapshot_id),
        }
    }

    #[must_use]
    pub fn failed(platform: impl Into<String>, duration_ms: i64, error: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            succeeded: false,
            records_processed: 0,
            duration_ms,
            error_message: Some(error.into()),
            snapshot_id: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.succeeded {
            "succeeded"
        } else {
            "failed"
        }
    }
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, \
     started_at, completed_at, records_processed, error_message, created_at";

// ---------------------------------------------------------------------------
// capture_runs operations
// ---------------------------------------------------------------------------

/// Insert a run in `queued` status with a fresh public id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_capture_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<CaptureRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, CaptureRunRow>(&format!(
        "INSERT INTO capture_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Move a queued run to `running`, stamping `started_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCaptureRunTransition`] if the run is not
/// `queued`, or [`DbError::Sqlx`] if the update fails.
pub async fn start_capture_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE capture_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCaptureRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Finish a running run as `succeeded` with its stored item count.
///
/// # Errors
///
/// Returns [`DbError::InvalidCaptureRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_capture_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE capture_runs \
         SET status = 'succeeded', completed_at = NOW(), records_processed = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCaptureRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Finish a running run as `failed`, keeping the error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidCaptureRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_capture_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE capture_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCaptureRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Look up one run.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown `id`, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_capture_run(pool: &PgPool, id: i64) -> Result<CaptureRunRow, DbError> {
    sqlx::query_as::<_, CaptureRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM capture_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_capture_runs(pool: &PgPool, limit: i64) -> Result<Vec<CaptureRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CaptureRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM capture_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// capture_run_platforms operations
// ---------------------------------------------------------------------------

/// Inserts or replaces the per-platform result row for a capture run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_capture_run_platform(
    pool: &PgPool,
    run_id: i64,
    outcome: &PlatformOutcome,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO capture_run_platforms \
             (capture_run_id, platform, status, records_processed, duration_ms, \
              error_message, snapshot_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (capture_run_id, platform) DO UPDATE SET \
             status            = EXCLUDED.status, \
             records_processed = EXCLUDED.records_processed, \
             duration_ms       = EXCLUDED.duration_ms, \
             error_message     = EXCLUDED.error_message, \
             snapshot_id       = EXCLUDED.snapshot_id",
    )
    .bind(run_id)
    .bind(&outcome.platform)
    .bind(outcome.status())
    .bind(outcome.records_processed)
    .bind(outcome.duration_ms)
    .bind(&outcome.error_message)
    .bind(outcome.snapshot_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns all platform rows for a run, ordered by platform id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_capture_run_platforms(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<CaptureRunPlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, CaptureRunPlatformRow>(
        "SELECT id, capture_run_id, platform, status, records_processed, duration_ms, \
                error_message, snapshot_id, created_at \
         FROM capture_run_platforms \
         WHERE capture_run_id = $1 \
         ORDER BY platform",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

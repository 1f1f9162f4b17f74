//! Database operations for `sync_jobs`.
//!
//! Jobs are created directly in `running` status. Every later write is
//! guarded by `WHERE status = 'running'`, so a finalized job can never be
//! mutated again.

use chrono::{DateTime, Utc};
use dropsync_core::{JobProgress, JobStatus, NewSyncJob, SyncJob};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{count_from_db, count_to_db, limit_to_db, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `sync_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncJobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub supplier_id: String,
    pub supplier_name: String,
    pub connector_type: String,
    pub kind: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_records: i32,
    pub processed_records: i32,
    pub successful_records: i32,
    pub failed_records: i32,
    pub skipped_records: i32,
    pub inserted_records: i32,
    pub updated_records: i32,
    pub error_details: Vec<String>,
}

impl TryFrom<SyncJobRow> for SyncJob {
    type Error = DbError;

    fn try_from(row: SyncJobRow) -> Result<Self, Self::Error> {
        Ok(SyncJob {
            id: row.id,
            user_id: row.user_id,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            connector: row.connector_type.parse()?,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            progress: JobProgress {
                total: count_from_db(row.total_records),
                processed: count_from_db(row.processed_records),
                succeeded: count_from_db(row.successful_records),
                failed: count_from_db(row.failed_records),
                skipped: count_from_db(row.skipped_records),
                inserted: count_from_db(row.inserted_records),
                updated: count_from_db(row.updated_records),
            },
            error_details: row.error_details,
        })
    }
}

// ---------------------------------------------------------------------------
// sync_jobs operations
// ---------------------------------------------------------------------------

/// Creates a job in `running` status with zeroed counters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_sync_job(pool: &PgPool, job: &NewSyncJob) -> Result<SyncJob, DbError> {
    let row = sqlx::query_as::<_, SyncJobRow>(
        "INSERT INTO sync_jobs \
             (id, user_id, supplier_id, supplier_name, connector_type, kind, status) \
         VALUES ($1, $2, $3, $4, $5, $6, 'running') \
         RETURNING id, user_id, supplier_id, supplier_name, connector_type, kind, status, \
                   started_at, completed_at, total_records, processed_records, \
                   successful_records, failed_records, skipped_records, inserted_records, \
                   updated_records, error_details",
    )
    .bind(Uuid::new_v4())
    .bind(job.user_id)
    .bind(&job.supplier_id)
    .bind(&job.supplier_name)
    .bind(job.connector.as_str())
    .bind(job.kind.as_str())
    .fetch_one(pool)
    .await?;

    SyncJob::try_from(row)
}

/// Writes intermediate counters and error details of a running job.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_sync_job_progress(
    pool: &PgPool,
    id: Uuid,
    progress: &JobProgress,
    error_details: &[String],
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_jobs SET \
             total_records      = $2, \
             processed_records  = $3, \
             successful_records = $4, \
             failed_records     = $5, \
             skipped_records    = $6, \
             inserted_records   = $7, \
             updated_records    = $8, \
             error_details      = $9 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(count_to_db(progress.total))
    .bind(count_to_db(progress.processed))
    .bind(count_to_db(progress.succeeded))
    .bind(count_to_db(progress.failed))
    .bind(count_to_db(progress.skipped))
    .bind(count_to_db(progress.inserted))
    .bind(count_to_db(progress.updated))
    .bind(error_details)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Moves a running job to a terminal status with its final counters.
///
/// # Errors
///
/// Returns [`DbError::NonTerminalStatus`] for `pending`/`running`,
/// [`DbError::InvalidJobTransition`] if the job is not running (already
/// finalized or unknown), or [`DbError::Sqlx`] if the update fails.
pub async fn finalize_sync_job(
    pool: &PgPool,
    id: Uuid,
    status: JobStatus,
    progress: &JobProgress,
    error_details: &[String],
) -> Result<SyncJob, DbError> {
    if !status.is_terminal() {
        return Err(DbError::NonTerminalStatus(status));
    }

    let row = sqlx::query_as::<_, SyncJobRow>(
        "UPDATE sync_jobs SET \
             status             = $2, \
             completed_at       = NOW(), \
             total_records      = $3, \
             processed_records  = $4, \
             successful_records = $5, \
             failed_records     = $6, \
             skipped_records    = $7, \
             inserted_records   = $8, \
             updated_records    = $9, \
             error_details      = $10 \
         WHERE id = $1 AND status = 'running' \
         RETURNING id, user_id, supplier_id, supplier_name, connector_type, kind, status, \
                   started_at, completed_at, total_records, processed_records, \
                   successful_records, failed_records, skipped_records, inserted_records, \
                   updated_records, error_details",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(count_to_db(progress.total))
    .bind(count_to_db(progress.processed))
    .bind(count_to_db(progress.succeeded))
    .bind(count_to_db(progress.failed))
    .bind(count_to_db(progress.skipped))
    .bind(count_to_db(progress.inserted))
    .bind(count_to_db(progress.updated))
    .bind(error_details)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => SyncJob::try_from(row),
        None => Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        }),
    }
}

/// Fetches one job owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if
/// a stored enum column holds an unknown value.
pub async fn get_sync_job(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<SyncJob>, DbError> {
    let row = sqlx::query_as::<_, SyncJobRow>(
        "SELECT id, user_id, supplier_id, supplier_name, connector_type, kind, status, \
                started_at, completed_at, total_records, processed_records, \
                successful_records, failed_records, skipped_records, inserted_records, \
                updated_records, error_details \
         FROM sync_jobs \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(SyncJob::try_from).transpose()
}

/// Lists the most recent jobs of `user_id`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_jobs(
    pool: &PgPool,
    user_id: Uuid,
    limit: u32,
) -> Result<Vec<SyncJob>, DbError> {
    let rows = sqlx::query_as::<_, SyncJobRow>(
        "SELECT id, user_id, supplier_id, supplier_name, connector_type, kind, status, \
                started_at, completed_at, total_records, processed_records, \
                successful_records, failed_records, skipped_records, inserted_records, \
                updated_records, error_details \
         FROM sync_jobs \
         WHERE user_id = $1 \
         ORDER BY started_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit_to_db(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SyncJob::try_from).collect()
}

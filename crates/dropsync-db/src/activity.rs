//! Fire-and-forget writes: `activity_logs` and `supplier_analytics`.

use dropsync_core::{ActivityEntry, SupplierAnalytics};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::{count_to_db, DbError};

/// Appends one activity log entry.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_activity_log(pool: &PgPool, entry: &ActivityEntry) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO activity_logs \
             (user_id, action, entity_type, entity_id, description, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.user_id)
    .bind(&entry.action)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.description)
    .bind(Json(&entry.metadata))
    .execute(pool)
    .await?;

    Ok(())
}

/// Upserts the per-day roll-up for one supplier and sync kind. A later run
/// on the same day replaces the earlier one's figures.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_supplier_analytics(
    pool: &PgPool,
    analytics: &SupplierAnalytics,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO supplier_analytics \
             (user_id, supplier_id, kind, date, connector_type, total_records, sync_status, \
              last_sync_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (user_id, supplier_id, kind, date) DO UPDATE SET \
             connector_type = EXCLUDED.connector_type, \
             total_records  = EXCLUDED.total_records, \
             sync_status    = EXCLUDED.sync_status, \
             last_sync_at   = EXCLUDED.last_sync_at",
    )
    .bind(analytics.user_id)
    .bind(&analytics.supplier_id)
    .bind(analytics.kind.as_str())
    .bind(analytics.date)
    .bind(analytics.connector.as_str())
    .bind(count_to_db(analytics.total_records))
    .bind(&analytics.sync_status)
    .bind(analytics.last_sync_at)
    .execute(pool)
    .await?;

    Ok(())
}

use dropsync_core::SupplierConnection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::connections::upsert_supplier_connection;
use crate::DbError;

/// Upsert supplier connections for `user_id`.
///
/// Returns the number of connections processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_supplier_connections(
    pool: &PgPool,
    user_id: Uuid,
    connections: &[SupplierConnection],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    for connection in connections {
        upsert_supplier_connection(&mut *tx, user_id, connection).await?;
    }

    tx.commit().await?;
    Ok(connections.len())
}

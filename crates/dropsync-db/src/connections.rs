//! Database operations for `supplier_connections`.

use chrono::{DateTime, Utc};
use dropsync_core::{SupplierConnection, SupplierCredentials};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A row from the `supplier_connections` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierConnectionRow {
    pub user_id: Uuid,
    pub supplier_id: String,
    pub name: String,
    pub connector: String,
    pub credentials: Json<SupplierCredentials>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SupplierConnectionRow> for SupplierConnection {
    type Error = DbError;

    fn try_from(row: SupplierConnectionRow) -> Result<Self, Self::Error> {
        Ok(SupplierConnection {
            supplier_id: row.supplier_id,
            name: row.name,
            connector: row.connector.parse()?,
            credentials: row.credentials.0,
        })
    }
}

/// Reads one stored connection.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if
/// the stored connector type is unknown.
pub async fn get_supplier_connection(
    pool: &PgPool,
    user_id: Uuid,
    supplier_id: &str,
) -> Result<Option<SupplierConnection>, DbError> {
    let row = sqlx::query_as::<_, SupplierConnectionRow>(
        "SELECT user_id, supplier_id, name, connector, credentials, created_at, updated_at \
         FROM supplier_connections \
         WHERE user_id = $1 AND supplier_id = $2",
    )
    .bind(user_id)
    .bind(supplier_id)
    .fetch_optional(pool)
    .await?;

    row.map(SupplierConnection::try_from).transpose()
}

/// Inserts or replaces a connection. Used by seeding; the engine never
/// writes credentials.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_supplier_connection<'e, E>(
    executor: E,
    user_id: Uuid,
    connection: &SupplierConnection,
) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO supplier_connections (user_id, supplier_id, name, connector, credentials) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, supplier_id) DO UPDATE SET \
             name        = EXCLUDED.name, \
             connector   = EXCLUDED.connector, \
             credentials = EXCLUDED.credentials, \
             updated_at  = NOW()",
    )
    .bind(user_id)
    .bind(&connection.supplier_id)
    .bind(&connection.name)
    .bind(connection.connector.as_str())
    .bind(Json(&connection.credentials))
    .execute(executor)
    .await?;

    Ok(())
}

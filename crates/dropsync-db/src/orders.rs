//! Database operations for `supplier_orders`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dropsync_core::{NormalizedOrder, OrderLineItem, SupplierOrder};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{limit_to_db, DbError};

/// A row from the `supplier_orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub supplier_name: String,
    pub external_order_id: String,
    pub status: String,
    pub currency: String,
    pub total_amount: Decimal,
    pub tracking_number: Option<String>,
    pub line_items: Json<Vec<OrderLineItem>>,
    pub placed_at: Option<DateTime<Utc>>,
    pub attributes: Json<BTreeMap<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SupplierOrderRow> for SupplierOrder {
    fn from(row: SupplierOrderRow) -> Self {
        SupplierOrder {
            id: row.id,
            user_id: row.user_id,
            order: NormalizedOrder {
                external_order_id: row.external_order_id,
                supplier_name: row.supplier_name,
                status: row.status,
                currency: row.currency,
                total_amount: row.total_amount,
                tracking_number: row.tracking_number,
                line_items: row.line_items.0,
                placed_at: row.placed_at,
                attributes: row.attributes.0,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Upserts an order keyed by `(user_id, supplier_name, external_order_id)`.
///
/// Returns the row id and whether it was newly inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_order(
    pool: &PgPool,
    user_id: Uuid,
    order: &NormalizedOrder,
) -> Result<(Uuid, bool), DbError> {
    let (id, inserted): (Uuid, bool) = sqlx::query_as(
        "INSERT INTO supplier_orders \
             (user_id, supplier_name, external_order_id, status, currency, total_amount, \
              tracking_number, line_items, placed_at, attributes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT ON CONSTRAINT supplier_orders_identity DO UPDATE SET \
             status          = EXCLUDED.status, \
             currency        = EXCLUDED.currency, \
             total_amount    = EXCLUDED.total_amount, \
             tracking_number = EXCLUDED.tracking_number, \
             line_items      = EXCLUDED.line_items, \
             placed_at       = EXCLUDED.placed_at, \
             attributes      = EXCLUDED.attributes, \
             updated_at      = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(user_id)
    .bind(&order.supplier_name)
    .bind(&order.external_order_id)
    .bind(&order.status)
    .bind(&order.currency)
    .bind(order.total_amount)
    .bind(&order.tracking_number)
    .bind(Json(&order.line_items))
    .bind(order.placed_at)
    .bind(Json(&order.attributes))
    .fetch_one(pool)
    .await?;

    Ok((id, inserted))
}

/// Most recently placed orders of `user_id` first; unknown dates sort last.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(
    pool: &PgPool,
    user_id: Uuid,
    limit: u32,
) -> Result<Vec<SupplierOrder>, DbError> {
    let rows = sqlx::query_as::<_, SupplierOrderRow>(
        "SELECT id, user_id, supplier_name, external_order_id, status, currency, total_amount, \
                tracking_number, line_items, placed_at, attributes, created_at, updated_at \
         FROM supplier_orders \
         WHERE user_id = $1 \
         ORDER BY placed_at DESC NULLS LAST, updated_at DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit_to_db(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SupplierOrder::from).collect())
}

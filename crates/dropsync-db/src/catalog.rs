//! Database operations for `catalog_products`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dropsync_core::{CatalogEntry, NormalizedProduct};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{count_from_db, count_to_db, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `catalog_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogProductRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub supplier_name: String,
    pub external_id: String,
    pub sku: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    pub currency: String,
    /// `CHECK (stock_quantity >= 0)` in the schema.
    pub stock_quantity: i32,
    pub category: String,
    pub brand: Option<String>,
    pub image_urls: Vec<String>,
    pub attributes: Json<BTreeMap<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CatalogProductRow> for CatalogEntry {
    fn from(row: CatalogProductRow) -> Self {
        CatalogEntry {
            id: row.id,
            user_id: row.user_id,
            product: NormalizedProduct {
                external_id: row.external_id,
                sku: row.sku,
                title: row.title,
                description: row.description,
                price: row.price,
                cost_price: row.cost_price,
                currency: row.currency,
                stock_quantity: count_from_db(row.stock_quantity),
                category: row.category,
                brand: row.brand,
                image_urls: row.image_urls,
                attributes: row.attributes.0,
                supplier_name: row.supplier_name,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// catalog_products operations
// ---------------------------------------------------------------------------

/// Looks up the entry identified by `(user_id, supplier_name, external_id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_catalog_product(
    pool: &PgPool,
    user_id: Uuid,
    supplier_name: &str,
    external_id: &str,
) -> Result<Option<CatalogEntry>, DbError> {
    let row = sqlx::query_as::<_, CatalogProductRow>(
        "SELECT id, user_id, supplier_name, external_id, sku, title, description, price, \
                cost_price, currency, stock_quantity, category, brand, image_urls, attributes, \
                created_at, updated_at \
         FROM catalog_products \
         WHERE user_id = $1 AND supplier_name = $2 AND external_id = $3",
    )
    .bind(user_id)
    .bind(supplier_name)
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CatalogEntry::from))
}

/// Most recently updated entry of one supplier carrying `sku`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_catalog_product_by_sku(
    pool: &PgPool,
    user_id: Uuid,
    supplier_name: &str,
    sku: &str,
) -> Result<Option<CatalogEntry>, DbError> {
    let row = sqlx::query_as::<_, CatalogProductRow>(
        "SELECT id, user_id, supplier_name, external_id, sku, title, description, price, \
                cost_price, currency, stock_quantity, category, brand, image_urls, attributes, \
                created_at, updated_at \
         FROM catalog_products \
         WHERE user_id = $1 AND supplier_name = $2 AND sku = $3 \
         ORDER BY updated_at DESC, id \
         LIMIT 1",
    )
    .bind(user_id)
    .bind(supplier_name)
    .bind(sku)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CatalogEntry::from))
}

/// Inserts a catalog entry, resolving a concurrent insert of the same key
/// into an overwrite.
///
/// Conflicts on `(user_id, supplier_name, external_id)` overwrite every
/// mutable column. Returns the row id and whether a new row was created
/// (`xmax = 0` only holds for freshly inserted tuples).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn insert_catalog_product(
    pool: &PgPool,
    user_id: Uuid,
    product: &NormalizedProduct,
) -> Result<(Uuid, bool), DbError> {
    let (id, inserted): (Uuid, bool) = sqlx::query_as(
        "INSERT INTO catalog_products \
             (user_id, supplier_name, external_id, sku, title, description, price, cost_price, \
              currency, stock_quantity, category, brand, image_urls, attributes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, \
                 $9, $10, $11, $12, $13, $14) \
         ON CONFLICT ON CONSTRAINT catalog_products_identity DO UPDATE SET \
             sku            = EXCLUDED.sku, \
             title          = EXCLUDED.title, \
             description    = EXCLUDED.description, \
             price          = EXCLUDED.price, \
             cost_price     = EXCLUDED.cost_price, \
             currency       = EXCLUDED.currency, \
             stock_quantity = EXCLUDED.stock_quantity, \
             category       = EXCLUDED.category, \
             brand          = EXCLUDED.brand, \
             image_urls     = EXCLUDED.image_urls, \
             attributes     = EXCLUDED.attributes, \
             updated_at     = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(user_id)
    .bind(&product.supplier_name)
    .bind(&product.external_id)
    .bind(&product.sku)
    .bind(&product.title)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.cost_price)
    .bind(&product.currency)
    .bind(count_to_db(product.stock_quantity))
    .bind(&product.category)
    .bind(&product.brand)
    .bind(&product.image_urls)
    .bind(Json(&product.attributes))
    .fetch_one(pool)
    .await?;

    Ok((id, inserted))
}

/// Overwrites every mutable column of entry `id`, including the identity
/// columns (used when a SKU match adopts a row under a new external id).
/// `id` and `created_at` are never touched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no entry `id` belongs to `user_id`, or
/// [`DbError::Sqlx`] if the update fails (including a unique violation when
/// the new external id is already taken).
pub async fn update_catalog_product(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    product: &NormalizedProduct,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE catalog_products SET \
             supplier_name  = $3, \
             external_id    = $4, \
             sku            = $5, \
             title          = $6, \
             description    = $7, \
             price          = $8, \
             cost_price     = $9, \
             currency       = $10, \
             stock_quantity = $11, \
             category       = $12, \
             brand          = $13, \
             image_urls     = $14, \
             attributes     = $15, \
             updated_at     = NOW() \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .bind(&product.supplier_name)
    .bind(&product.external_id)
    .bind(&product.sku)
    .bind(&product.title)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.cost_price)
    .bind(&product.currency)
    .bind(count_to_db(product.stock_quantity))
    .bind(&product.category)
    .bind(&product.brand)
    .bind(&product.image_urls)
    .bind(Json(&product.attributes))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Every catalog entry of `user_id`, ordered by supplier then external id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_catalog_products(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<CatalogEntry>, DbError> {
    let rows = sqlx::query_as::<_, CatalogProductRow>(
        "SELECT id, user_id, supplier_name, external_id, sku, title, description, price, \
                cost_price, currency, stock_quantity, category, brand, image_urls, attributes, \
                created_at, updated_at \
         FROM catalog_products \
         WHERE user_id = $1 \
         ORDER BY supplier_name, external_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CatalogEntry::from).collect())
}

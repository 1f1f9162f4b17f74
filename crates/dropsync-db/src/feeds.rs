//! Database operations for `feeds`, `feed_category_mappings`, `feed_items`
//! and `feed_generation_runs`.

use chrono::{DateTime, Utc};
use dropsync_core::{
    CategoryMapping, Feed, FeedGenerationRun, FeedItem, FeedRunTotals, JobStatus,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{count_from_db, count_to_db, limit_to_db, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `feeds` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub platform: String,
    pub title_template: String,
    pub description_template: String,
    /// `CHECK (max_title_length > 0)` in the schema.
    pub max_title_length: i32,
    pub max_description_length: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            platform: row.platform,
            title_template: row.title_template,
            description_template: row.description_template,
            max_title_length: usize::try_from(row.max_title_length).unwrap_or(1),
            max_description_length: usize::try_from(row.max_description_length).unwrap_or(1),
        }
    }
}

/// A row from the `feed_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedItemRow {
    pub feed_id: Uuid,
    pub catalog_product_id: Uuid,
    pub sku: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub currency: String,
    pub availability: String,
    pub image_urls: Vec<String>,
    pub quality_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FeedItemRow> for FeedItem {
    fn from(row: FeedItemRow) -> Self {
        FeedItem {
            feed_id: row.feed_id,
            catalog_id: row.catalog_product_id,
            sku: row.sku,
            title: row.title,
            description: row.description,
            category: row.category,
            price: row.price,
            currency: row.currency,
            availability: row.availability,
            image_urls: row.image_urls,
            quality_score: row.quality_score,
        }
    }
}

/// A row from the `feed_generation_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedRunRow {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub status: String,
    pub total_products: i32,
    pub generated_items: i32,
    pub failed_items: i32,
    pub avg_seo_score: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<FeedRunRow> for FeedGenerationRun {
    type Error = DbError;

    fn try_from(row: FeedRunRow) -> Result<Self, Self::Error> {
        Ok(FeedGenerationRun {
            id: row.id,
            feed_id: row.feed_id,
            status: row.status.parse()?,
            total_products: count_from_db(row.total_products),
            generated_items: count_from_db(row.generated_items),
            failed_items: count_from_db(row.failed_items),
            avg_seo_score: row.avg_seo_score,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// Fields needed to create a feed.
#[derive(Debug, Clone)]
pub struct NewFeed<'a> {
    pub name: &'a str,
    pub platform: &'a str,
    pub title_template: &'a str,
    pub description_template: &'a str,
    pub max_title_length: u32,
    pub max_description_length: u32,
}

// ---------------------------------------------------------------------------
// feeds and mappings
// ---------------------------------------------------------------------------

/// Creates a feed owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including the length
/// `CHECK` constraints).
pub async fn create_feed(pool: &PgPool, user_id: Uuid, feed: &NewFeed<'_>) -> Result<Feed, DbError> {
    let row = sqlx::query_as::<_, FeedRow>(
        "INSERT INTO feeds \
             (user_id, name, platform, title_template, description_template, \
              max_title_length, max_description_length) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, user_id, name, platform, title_template, description_template, \
                   max_title_length, max_description_length, created_at, updated_at",
    )
    .bind(user_id)
    .bind(feed.name)
    .bind(feed.platform)
    .bind(feed.title_template)
    .bind(feed.description_template)
    .bind(count_to_db(feed.max_title_length))
    .bind(count_to_db(feed.max_description_length))
    .fetch_one(pool)
    .await?;

    Ok(Feed::from(row))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_feed(pool: &PgPool, user_id: Uuid, feed_id: Uuid) -> Result<Option<Feed>, DbError> {
    let row = sqlx::query_as::<_, FeedRow>(
        "SELECT id, user_id, name, platform, title_template, description_template, \
                max_title_length, max_description_length, created_at, updated_at \
         FROM feeds \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(feed_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Feed::from))
}

/// Sets (or replaces) the target category for one source category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_category_mapping(
    pool: &PgPool,
    feed_id: Uuid,
    mapping: &CategoryMapping,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO feed_category_mappings (feed_id, source_category, target_category) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (feed_id, source_category) DO UPDATE SET \
             target_category = EXCLUDED.target_category",
    )
    .bind(feed_id)
    .bind(&mapping.source_category)
    .bind(&mapping.target_category)
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_category_mappings(
    pool: &PgPool,
    feed_id: Uuid,
) -> Result<Vec<CategoryMapping>, DbError> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT source_category, target_category \
         FROM feed_category_mappings \
         WHERE feed_id = $1 \
         ORDER BY source_category",
    )
    .bind(feed_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(source_category, target_category)| CategoryMapping {
            source_category,
            target_category,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// feed_items
// ---------------------------------------------------------------------------

/// Upserts a feed item keyed by `(feed_id, catalog_product_id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_feed_item(pool: &PgPool, item: &FeedItem) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO feed_items \
             (feed_id, catalog_product_id, sku, title, description, category, price, currency, \
              availability, image_urls, quality_score) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (feed_id, catalog_product_id) DO UPDATE SET \
             sku           = EXCLUDED.sku, \
             title         = EXCLUDED.title, \
             description   = EXCLUDED.description, \
             category      = EXCLUDED.category, \
             price         = EXCLUDED.price, \
             currency      = EXCLUDED.currency, \
             availability  = EXCLUDED.availability, \
             image_urls    = EXCLUDED.image_urls, \
             quality_score = EXCLUDED.quality_score, \
             updated_at    = NOW()",
    )
    .bind(item.feed_id)
    .bind(item.catalog_id)
    .bind(&item.sku)
    .bind(&item.title)
    .bind(&item.description)
    .bind(&item.category)
    .bind(item.price)
    .bind(&item.currency)
    .bind(&item.availability)
    .bind(&item.image_urls)
    .bind(item.quality_score)
    .execute(pool)
    .await?;

    Ok(())
}

/// Highest-scoring items first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_feed_items(
    pool: &PgPool,
    feed_id: Uuid,
    limit: u32,
) -> Result<Vec<FeedItem>, DbError> {
    let rows = sqlx::query_as::<_, FeedItemRow>(
        "SELECT feed_id, catalog_product_id, sku, title, description, category, price, \
                currency, availability, image_urls, quality_score, created_at, updated_at \
         FROM feed_items \
         WHERE feed_id = $1 \
         ORDER BY quality_score DESC, sku \
         LIMIT $2",
    )
    .bind(feed_id)
    .bind(limit_to_db(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(FeedItem::from).collect())
}

/// Deletes items of `feed_id` whose catalog product is not in `keep`.
///
/// Returns the number of items removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn prune_feed_items(
    pool: &PgPool,
    feed_id: Uuid,
    keep: &[Uuid],
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM feed_items \
         WHERE feed_id = $1 AND NOT (catalog_product_id = ANY($2))",
    )
    .bind(feed_id)
    .bind(keep)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// feed_generation_runs
// ---------------------------------------------------------------------------

/// Creates a run in `running` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_feed_run(pool: &PgPool, feed_id: Uuid) -> Result<FeedGenerationRun, DbError> {
    let row = sqlx::query_as::<_, FeedRunRow>(
        "INSERT INTO feed_generation_runs (feed_id, status) \
         VALUES ($1, 'running') \
         RETURNING id, feed_id, status, total_products, generated_items, failed_items, \
                   avg_seo_score, started_at, completed_at",
    )
    .bind(feed_id)
    .fetch_one(pool)
    .await?;

    FeedGenerationRun::try_from(row)
}

/// Moves a running feed run to a terminal status with its totals.
///
/// # Errors
///
/// Returns [`DbError::NonTerminalStatus`], [`DbError::InvalidJobTransition`]
/// if the run is not running, or [`DbError::Sqlx`] if the update fails.
pub async fn finalize_feed_run(
    pool: &PgPool,
    run_id: Uuid,
    status: JobStatus,
    totals: &FeedRunTotals,
) -> Result<FeedGenerationRun, DbError> {
    if !status.is_terminal() {
        return Err(DbError::NonTerminalStatus(status));
    }

    let row = sqlx::query_as::<_, FeedRunRow>(
        "UPDATE feed_generation_runs SET \
             status          = $2, \
             total_products  = $3, \
             generated_items = $4, \
             failed_items    = $5, \
             avg_seo_score   = $6, \
             completed_at    = NOW() \
         WHERE id = $1 AND status = 'running' \
         RETURNING id, feed_id, status, total_products, generated_items, failed_items, \
                   avg_seo_score, started_at, completed_at",
    )
    .bind(run_id)
    .bind(status.as_str())
    .bind(count_to_db(totals.total_products))
    .bind(count_to_db(totals.generated_items))
    .bind(count_to_db(totals.failed_items))
    .bind(totals.avg_seo_score)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => FeedGenerationRun::try_from(row),
        None => Err(DbError::InvalidJobTransition {
            id: run_id,
            expected_status: "running",
        }),
    }
}

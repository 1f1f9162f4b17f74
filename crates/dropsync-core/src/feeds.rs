use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync_job::JobStatus;

/// A per-platform export definition owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Target marketplace, e.g. `google_shopping`.
    pub platform: String,
    /// Template with `{{field}}` placeholders.
    pub title_template: String,
    pub description_template: String,
    pub max_title_length: usize,
    pub max_description_length: usize,
}

/// Maps a supplier category to the target platform's taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMapping {
    pub source_category: String,
    pub target_category: String,
}

/// One optimized listing produced from a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub feed_id: Uuid,
    pub catalog_id: Uuid,
    pub sku: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub currency: String,
    pub availability: String,
    pub image_urls: Vec<String>,
    /// Composite quality score in `[0, 1]`.
    pub quality_score: f64,
}

/// Lifecycle record for one feed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedGenerationRun {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub status: JobStatus,
    pub total_products: u32,
    pub generated_items: u32,
    pub failed_items: u32,
    pub avg_seo_score: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Final counts written when a feed run is finalized.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedRunTotals {
    pub total_products: u32,
    pub generated_items: u32,
    pub failed_items: u32,
    pub avg_seo_score: f64,
}

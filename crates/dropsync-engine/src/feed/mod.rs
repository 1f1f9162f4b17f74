//! Feed generation: catalog entries to per-platform feed items.
//!
//! The mirror of a sync run. Each catalog product is rendered through the
//! feed's templates, mapped to a target category and scored; a product that
//! cannot be turned into an item is logged and counted, and the run still
//! finalizes with whatever succeeded.

pub mod export;
pub mod score;
pub mod template;

use std::collections::HashMap;
use std::sync::Arc;

use dropsync_core::{
    CatalogEntry, CatalogStore, CategoryMapping, Feed, FeedGenerationRun, FeedItem,
    FeedRunTotals, FeedStore, JobStatus,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::FeedError;

pub use export::render_rss;
pub use score::quality_score;

/// Upper bound on items returned by [`FeedGenerator::export`].
pub const EXPORT_ITEM_LIMIT: u32 = 10_000;

#[derive(Clone)]
pub struct FeedGenerator {
    catalog: Arc<dyn CatalogStore>,
    feeds: Arc<dyn FeedStore>,
}

/// Source category to target category, compared case-insensitively.
fn mapping_table(mappings: Vec<CategoryMapping>) -> HashMap<String, String> {
    mappings
        .into_iter()
        .map(|m| (m.source_category.trim().to_lowercase(), m.target_category))
        .collect()
}

/// Builds the feed item for one catalog entry. Pure.
///
/// # Errors
///
/// Returns [`FeedError::Item`] when the rendered title is empty or the
/// product has no positive price.
pub fn build_item(
    feed: &Feed,
    categories: &HashMap<String, String>,
    entry: &CatalogEntry,
) -> Result<FeedItem, FeedError> {
    let product = &entry.product;
    let title = template::render(&feed.title_template, product, feed.max_title_length);
    if title.is_empty() {
        return Err(FeedError::Item {
            sku: product.sku.clone(),
            reason: "title template rendered empty".to_string(),
        });
    }
    if product.price <= Decimal::ZERO {
        return Err(FeedError::Item {
            sku: product.sku.clone(),
            reason: format!("price {} is not positive", product.price),
        });
    }
    let description = template::render(
        &feed.description_template,
        product,
        feed.max_description_length,
    );
    let category = categories
        .get(&product.category.trim().to_lowercase())
        .cloned()
        .unwrap_or_else(|| product.category.clone());
    let availability = if product.stock_quantity > 0 {
        "in_stock"
    } else {
        "out_of_stock"
    };
    let quality_score = score::quality_score(&title, &description, product.image_urls.len());

    Ok(FeedItem {
        feed_id: feed.id,
        catalog_id: entry.id,
        sku: product.sku.clone(),
        title,
        description,
        category,
        price: product.price,
        currency: product.currency.clone(),
        availability: availability.to_string(),
        image_urls: product.image_urls.clone(),
        quality_score,
    })
}

impl FeedGenerator {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogStore>, feeds: Arc<dyn FeedStore>) -> Self {
        Self { catalog, feeds }
    }

    async fn load_feed(&self, user_id: Uuid, feed_id: Uuid) -> Result<Feed, FeedError> {
        self.feeds
            .get_feed(user_id, feed_id)
            .await?
            .ok_or(FeedError::NotFound(feed_id))
    }

    async fn mark_failed(&self, run_id: Uuid, totals: &FeedRunTotals) {
        if let Err(e) = self
            .feeds
            .finalize_feed_run(run_id, JobStatus::Failed, totals)
            .await
        {
            tracing::error!(run_id = %run_id, error = %e, "failed to record feed run failure");
        }
    }

    /// Regenerates every item of `feed_id` from the user's catalog. Items
    /// whose product no longer yields one are removed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] for an unknown feed, and
    /// [`FeedError::Store`] if the run cannot be created or finalized or the
    /// catalog cannot be read. Per-product failures are counted, not returned.
    pub async fn generate(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<FeedGenerationRun, FeedError> {
        let feed = self.load_feed(user_id, feed_id).await?;
        let categories = mapping_table(self.feeds.category_mappings(feed_id).await?);
        let run = self.feeds.create_feed_run(feed_id).await?;
        tracing::info!(feed_id = %feed_id, run_id = %run.id, "feed generation started");

        let entries = match self.catalog.list_for_user(user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(feed_id = %feed_id, error = %e, "failed to read catalog");
                self.mark_failed(run.id, &FeedRunTotals::default()).await;
                return Err(e.into());
            }
        };

        let mut totals = FeedRunTotals {
            total_products: u32::try_from(entries.len()).unwrap_or(u32::MAX),
            ..FeedRunTotals::default()
        };
        let mut score_sum = 0.0_f64;
        let mut kept = Vec::with_capacity(entries.len());

        for entry in &entries {
            let result = match build_item(&feed, &categories, entry) {
                Ok(item) => self
                    .feeds
                    .upsert_feed_item(&item)
                    .await
                    .map(|()| item.quality_score)
                    .map_err(FeedError::from),
                Err(e) => Err(e),
            };
            match result {
                Ok(score) => {
                    totals.generated_items += 1;
                    score_sum += score;
                    kept.push(entry.id);
                }
                Err(e) => {
                    tracing::warn!(
                        feed_id = %feed_id,
                        catalog_id = %entry.id,
                        error = %e,
                        "skipping product in feed"
                    );
                    totals.failed_items += 1;
                }
            }
        }

        if totals.generated_items > 0 {
            totals.avg_seo_score = score_sum / f64::from(totals.generated_items);
        }

        // Drop items of products that failed this run or left the catalog.
        match self.feeds.prune_feed_items(feed_id, &kept).await {
            Ok(removed) if removed > 0 => {
                tracing::info!(feed_id = %feed_id, removed, "stale feed items removed");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(feed_id = %feed_id, error = %e, "failed to prune feed items");
                self.mark_failed(run.id, &totals).await;
                return Err(e.into());
            }
        }

        let finished = self
            .feeds
            .finalize_feed_run(run.id, JobStatus::Completed, &totals)
            .await?;
        tracing::info!(
            feed_id = %feed_id,
            run_id = %finished.id,
            generated = finished.generated_items,
            failed = finished.failed_items,
            avg_seo_score = finished.avg_seo_score,
            "feed generation finished"
        );
        Ok(finished)
    }

    /// Items of a feed, best score first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] when the feed does not belong to
    /// `user_id`, or [`FeedError::Store`] if the read fails.
    pub async fn items(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
        limit: u32,
    ) -> Result<Vec<FeedItem>, FeedError> {
        self.load_feed(user_id, feed_id).await?;
        Ok(self.feeds.list_feed_items(feed_id, limit).await?)
    }

    /// Renders the feed's current items as an RSS document.
    ///
    /// # Errors
    ///
    /// Same as [`FeedGenerator::items`], plus [`FeedError::Export`].
    pub async fn export(&self, user_id: Uuid, feed_id: Uuid) -> Result<String, FeedError> {
        let feed = self.load_feed(user_id, feed_id).await?;
        let items = self.feeds.list_feed_items(feed_id, EXPORT_ITEM_LIMIT).await?;
        render_rss(&feed, &items)
    }
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod tests;

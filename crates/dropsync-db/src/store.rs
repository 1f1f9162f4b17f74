//! [`PgStore`]: the Postgres backend behind every engine store trait.

use async_trait::async_trait;
use dropsync_core::{
    ActivityEntry, ActivityLog, CatalogEntry, CatalogStore, CategoryMapping, CredentialStore,
    Feed, FeedGenerationRun, FeedItem, FeedRunTotals, FeedStore, JobProgress, JobStatus, JobStore,
    NewSyncJob, NormalizedOrder, NormalizedProduct, OrderStore, StoreError, SupplierAnalytics,
    SupplierConnection, SupplierOrder, SyncJob, UpsertAction, UpsertOutcome,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{activity, catalog, connections, feeds, orders, sync_jobs, DbError};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_unique_violation() {
            return StoreError::Conflict(err.to_string());
        }
        match err {
            DbError::NotFound => StoreError::NotFound("record".to_owned()),
            DbError::InvalidJobTransition {
                id,
                expected_status,
            } => StoreError::InvalidTransition {
                id,
                expected: expected_status,
            },
            other => StoreError::Backend(other.to_string()),
        }
    }
}

fn action(inserted: bool) -> UpsertAction {
    if inserted {
        UpsertAction::Inserted
    } else {
        UpsertAction::Updated
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_by_external_id(
        &self,
        user_id: Uuid,
        supplier_name: &str,
        external_id: &str,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        Ok(catalog::find_catalog_product(&self.pool, user_id, supplier_name, external_id).await?)
    }

    async fn find_by_sku(
        &self,
        user_id: Uuid,
        supplier_name: &str,
        sku: &str,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        Ok(catalog::find_catalog_product_by_sku(&self.pool, user_id, supplier_name, sku).await?)
    }

    async fn insert(
        &self,
        user_id: Uuid,
        product: &NormalizedProduct,
    ) -> Result<UpsertOutcome, StoreError> {
        let (id, inserted) = catalog::insert_catalog_product(&self.pool, user_id, product).await?;
        Ok(UpsertOutcome {
            id,
            action: action(inserted),
        })
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        product: &NormalizedProduct,
    ) -> Result<(), StoreError> {
        catalog::update_catalog_product(&self.pool, user_id, id, product)
            .await
            .map_err(|e| match e {
                DbError::NotFound => StoreError::NotFound(format!("catalog entry {id}")),
                other => other.into(),
            })
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CatalogEntry>, StoreError> {
        Ok(catalog::list_catalog_products(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create_job(&self, job: &NewSyncJob) -> Result<SyncJob, StoreError> {
        Ok(sync_jobs::create_sync_job(&self.pool, job).await?)
    }

    async fn update_job(
        &self,
        job_id: Uuid,
        progress: &JobProgress,
        error_details: &[String],
    ) -> Result<(), StoreError> {
        Ok(sync_jobs::update_sync_job_progress(&self.pool, job_id, progress, error_details).await?)
    }

    async fn finalize_job(
        &self,
        job_id: Uuid,
        status: JobStatus,
        progress: &JobProgress,
        error_details: &[String],
    ) -> Result<SyncJob, StoreError> {
        Ok(
            sync_jobs::finalize_sync_job(&self.pool, job_id, status, progress, error_details)
                .await?,
        )
    }

    async fn get_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Option<SyncJob>, StoreError> {
        Ok(sync_jobs::get_sync_job(&self.pool, user_id, job_id).await?)
    }

    async fn list_jobs(&self, user_id: Uuid, limit: u32) -> Result<Vec<SyncJob>, StoreError> {
        Ok(sync_jobs::list_sync_jobs(&self.pool, user_id, limit).await?)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn get_connection(
        &self,
        user_id: Uuid,
        supplier_id: &str,
    ) -> Result<Option<SupplierConnection>, StoreError> {
        Ok(connections::get_supplier_connection(&self.pool, user_id, supplier_id).await?)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn upsert_order(
        &self,
        user_id: Uuid,
        order: &NormalizedOrder,
    ) -> Result<UpsertOutcome, StoreError> {
        let (id, inserted) = orders::upsert_order(&self.pool, user_id, order).await?;
        Ok(UpsertOutcome {
            id,
            action: action(inserted),
        })
    }

    async fn list_orders(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<SupplierOrder>, StoreError> {
        Ok(orders::list_orders(&self.pool, user_id, limit).await?)
    }
}

#[async_trait]
impl ActivityLog for PgStore {
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        Ok(activity::insert_activity_log(&self.pool, entry).await?)
    }

    async fn record_supplier_analytics(
        &self,
        analytics: &SupplierAnalytics,
    ) -> Result<(), StoreError> {
        Ok(activity::upsert_supplier_analytics(&self.pool, analytics).await?)
    }
}

#[async_trait]
impl FeedStore for PgStore {
    async fn get_feed(&self, user_id: Uuid, feed_id: Uuid) -> Result<Option<Feed>, StoreError> {
        Ok(feeds::get_feed(&self.pool, user_id, feed_id).await?)
    }

    async fn category_mappings(&self, feed_id: Uuid) -> Result<Vec<CategoryMapping>, StoreError> {
        Ok(feeds::list_category_mappings(&self.pool, feed_id).await?)
    }

    async fn upsert_feed_item(&self, item: &FeedItem) -> Result<(), StoreError> {
        Ok(feeds::upsert_feed_item(&self.pool, item).await?)
    }

    async fn list_feed_items(&self, feed_id: Uuid, limit: u32) -> Result<Vec<FeedItem>, StoreError> {
        Ok(feeds::list_feed_items(&self.pool, feed_id, limit).await?)
    }

    async fn prune_feed_items(&self, feed_id: Uuid, keep: &[Uuid]) -> Result<u64, StoreError> {
        Ok(feeds::prune_feed_items(&self.pool, feed_id, keep).await?)
    }

    async fn create_feed_run(&self, feed_id: Uuid) -> Result<FeedGenerationRun, StoreError> {
        Ok(feeds::create_feed_run(&self.pool, feed_id).await?)
    }

    async fn finalize_feed_run(
        &self,
        run_id: Uuid,
        status: JobStatus,
        totals: &FeedRunTotals,
    ) -> Result<FeedGenerationRun, StoreError> {
        Ok(feeds::finalize_feed_run(&self.pool, run_id, status, totals).await?)
    }
}

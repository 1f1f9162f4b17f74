//! In-process implementation of every store trait.
//!
//! Mirrors the Postgres semantics that the engine relies on: catalog inserts
//! are atomic per key, job and feed-run finalization is guarded on `running`,
//! and everything is scoped by user.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dropsync_core::{
    ActivityEntry, ActivityLog, CatalogEntry, CatalogKey, CatalogStore, CategoryMapping,
    CredentialStore, Feed, FeedGenerationRun, FeedItem, FeedRunTotals, FeedStore, JobProgress,
    JobStatus, JobStore, NewSyncJob, NormalizedOrder, NormalizedProduct, OrderStore, StoreError,
    SupplierAnalytics, SupplierConnection, SupplierOrder, SyncJob, UpsertAction, UpsertOutcome,
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    catalog: HashMap<Uuid, CatalogEntry>,
    jobs: HashMap<Uuid, SyncJob>,
    connections: HashMap<(Uuid, String), SupplierConnection>,
    orders: HashMap<Uuid, SupplierOrder>,
    activity: Vec<ActivityEntry>,
    analytics: Vec<SupplierAnalytics>,
    feeds: HashMap<Uuid, Feed>,
    mappings: HashMap<Uuid, Vec<CategoryMapping>>,
    feed_items: HashMap<(Uuid, Uuid), FeedItem>,
    feed_runs: HashMap<Uuid, FeedGenerationRun>,
}

impl Inner {
    fn catalog_id_for(&self, user_id: Uuid, key: &CatalogKey) -> Option<Uuid> {
        self.catalog
            .values()
            .find(|e| e.user_id == user_id && e.product.key() == *key)
            .map(|e| e.id)
    }

    fn running_job(&mut self, job_id: Uuid) -> Result<&mut SyncJob, StoreError> {
        match self.jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::Running => Ok(job),
            Some(_) => Err(StoreError::InvalidTransition {
                id: job_id,
                expected: "running",
            }),
            None => Err(StoreError::NotFound(format!("sync job {job_id}"))),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) a supplier connection for `user_id`.
    pub async fn add_connection(&self, user_id: Uuid, connection: SupplierConnection) {
        let mut inner = self.inner.lock().await;
        inner
            .connections
            .insert((user_id, connection.supplier_id.clone()), connection);
    }

    /// Creates a feed with the given settings and returns it.
    pub async fn add_feed(&self, feed: Feed) -> Feed {
        let mut inner = self.inner.lock().await;
        inner.feeds.insert(feed.id, feed.clone());
        feed
    }

    pub async fn add_category_mapping(&self, feed_id: Uuid, mapping: CategoryMapping) {
        let mut inner = self.inner.lock().await;
        let mappings = inner.mappings.entry(feed_id).or_default();
        mappings.retain(|m| m.source_category != mapping.source_category);
        mappings.push(mapping);
    }

    pub async fn activity_entries(&self) -> Vec<ActivityEntry> {
        self.inner.lock().await.activity.clone()
    }

    pub async fn analytics(&self) -> Vec<SupplierAnalytics> {
        self.inner.lock().await.analytics.clone()
    }

    pub async fn feed_runs(&self, feed_id: Uuid) -> Vec<FeedGenerationRun> {
        let inner = self.inner.lock().await;
        let mut runs: Vec<_> = inner
            .feed_runs
            .values()
            .filter(|r| r.feed_id == feed_id)
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.started_at);
        runs
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_by_external_id(
        &self,
        user_id: Uuid,
        supplier_name: &str,
        external_id: &str,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .catalog
            .values()
            .find(|e| {
                e.user_id == user_id
                    && e.product.supplier_name == supplier_name
                    && e.product.external_id == external_id
            })
            .cloned())
    }

    async fn find_by_sku(
        &self,
        user_id: Uuid,
        supplier_name: &str,
        sku: &str,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .catalog
            .values()
            .filter(|e| {
                e.user_id == user_id
                    && e.product.supplier_name == supplier_name
                    && e.product.sku == sku
            })
            .max_by_key(|e| e.updated_at)
            .cloned())
    }

    async fn insert(
        &self,
        user_id: Uuid,
        product: &NormalizedProduct,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        if let Some(id) = inner.catalog_id_for(user_id, &product.key()) {
            if let Some(entry) = inner.catalog.get_mut(&id) {
                entry.product = product.clone();
                entry.updated_at = now;
            }
            return Ok(UpsertOutcome {
                id,
                action: UpsertAction::Updated,
            });
        }

        let id = Uuid::new_v4();
        inner.catalog.insert(
            id,
            CatalogEntry {
                id,
                user_id,
                product: product.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(UpsertOutcome {
            id,
            action: UpsertAction::Inserted,
        })
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        product: &NormalizedProduct,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .catalog_id_for(user_id, &product.key())
            .is_some_and(|other| other != id)
        {
            return Err(StoreError::Conflict(format!(
                "catalog key {} already belongs to another entry",
                product.key()
            )));
        }
        match inner.catalog.get_mut(&id) {
            Some(entry) if entry.user_id == user_id => {
                entry.product = product.clone();
                entry.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("catalog entry {id}"))),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CatalogEntry>, StoreError> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<_> = inner
            .catalog
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.product.key().cmp(&b.product.key()));
        Ok(entries)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, job: &NewSyncJob) -> Result<SyncJob, StoreError> {
        let created = SyncJob {
            id: Uuid::new_v4(),
            user_id: job.user_id,
            supplier_id: job.supplier_id.clone(),
            supplier_name: job.supplier_name.clone(),
            connector: job.connector,
            kind: job.kind,
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            progress: JobProgress::default(),
            error_details: Vec::new(),
        };
        self.inner
            .lock()
            .await
            .jobs
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_job(
        &self,
        job_id: Uuid,
        progress: &JobProgress,
        error_details: &[String],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.running_job(job_id)?;
        job.progress = *progress;
        job.error_details = error_details.to_vec();
        Ok(())
    }

    async fn finalize_job(
        &self,
        job_id: Uuid,
        status: JobStatus,
        progress: &JobProgress,
        error_details: &[String],
    ) -> Result<SyncJob, StoreError> {
        if !status.is_terminal() {
            return Err(StoreError::Backend(format!(
                "cannot finalize job with non-terminal status '{status}'"
            )));
        }
        let mut inner = self.inner.lock().await;
        let job = inner.running_job(job_id)?;
        job.status = status;
        job.progress = *progress;
        job.error_details = error_details.to_vec();
        job.completed_at = Some(Utc::now());
        Ok(job.clone())
    }

    async fn get_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Option<SyncJob>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .get(&job_id)
            .filter(|j| j.user_id == user_id)
            .cloned())
    }

    async fn list_jobs(&self, user_id: Uuid, limit: u32) -> Result<Vec<SyncJob>, StoreError> {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<_> = inner
            .jobs
            .values()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs.truncate(usize::try_from(limit.max(1)).unwrap_or(usize::MAX));
        Ok(jobs)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_connection(
        &self,
        user_id: Uuid,
        supplier_id: &str,
    ) -> Result<Option<SupplierConnection>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .connections
            .get(&(user_id, supplier_id.to_string()))
            .cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn upsert_order(
        &self,
        user_id: Uuid,
        order: &NormalizedOrder,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let existing = inner.orders.values_mut().find(|o| {
            o.user_id == user_id
                && o.order.supplier_name == order.supplier_name
                && o.order.external_order_id == order.external_order_id
        });
        if let Some(existing) = existing {
            existing.order = order.clone();
            existing.updated_at = now;
            return Ok(UpsertOutcome {
                id: existing.id,
                action: UpsertAction::Updated,
            });
        }

        let id = Uuid::new_v4();
        inner.orders.insert(
            id,
            SupplierOrder {
                id,
                user_id,
                order: order.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(UpsertOutcome {
            id,
            action: UpsertAction::Inserted,
        })
    }

    async fn list_orders(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<SupplierOrder>, StoreError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        orders.truncate(usize::try_from(limit.max(1)).unwrap_or(usize::MAX));
        Ok(orders)
    }
}

#[async_trait]
impl ActivityLog for MemoryStore {
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        self.inner.lock().await.activity.push(entry.clone());
        Ok(())
    }

    async fn record_supplier_analytics(
        &self,
        analytics: &SupplierAnalytics,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.analytics.retain(|a| {
            !(a.user_id == analytics.user_id
                && a.supplier_id == analytics.supplier_id
                && a.kind == analytics.kind
                && a.date == analytics.date)
        });
        inner.analytics.push(analytics.clone());
        Ok(())
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn get_feed(&self, user_id: Uuid, feed_id: Uuid) -> Result<Option<Feed>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .feeds
            .get(&feed_id)
            .filter(|f| f.user_id == user_id)
            .cloned())
    }

    async fn category_mappings(&self, feed_id: Uuid) -> Result<Vec<CategoryMapping>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.mappings.get(&feed_id).cloned().unwrap_or_default())
    }

    async fn upsert_feed_item(&self, item: &FeedItem) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .feed_items
            .insert((item.feed_id, item.catalog_id), item.clone());
        Ok(())
    }

    async fn list_feed_items(
        &self,
        feed_id: Uuid,
        limit: u32,
    ) -> Result<Vec<FeedItem>, StoreError> {
        let inner = self.inner.lock().await;
        let mut items: Vec<_> = inner
            .feed_items
            .values()
            .filter(|i| i.feed_id == feed_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.quality_score
                .total_cmp(&a.quality_score)
                .then_with(|| a.sku.cmp(&b.sku))
        });
        items.truncate(usize::try_from(limit.max(1)).unwrap_or(usize::MAX));
        Ok(items)
    }

    async fn prune_feed_items(&self, feed_id: Uuid, keep: &[Uuid]) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.feed_items.len();
        inner
            .feed_items
            .retain(|(feed, catalog_id), _| *feed != feed_id || keep.contains(catalog_id));
        Ok(u64::try_from(before - inner.feed_items.len()).unwrap_or(u64::MAX))
    }

    async fn create_feed_run(&self, feed_id: Uuid) -> Result<FeedGenerationRun, StoreError> {
        let run = FeedGenerationRun {
            id: Uuid::new_v4(),
            feed_id,
            status: JobStatus::Running,
            total_products: 0,
            generated_items: 0,
            failed_items: 0,
            avg_seo_score: 0.0,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.inner
            .lock()
            .await
            .feed_runs
            .insert(run.id, run.clone());
        Ok(run)
    }

    async fn finalize_feed_run(
        &self,
        run_id: Uuid,
        status: JobStatus,
        totals: &FeedRunTotals,
    ) -> Result<FeedGenerationRun, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.feed_runs.get_mut(&run_id) {
            Some(run) if run.status == JobStatus::Running && status.is_terminal() => {
                run.status = status;
                run.total_products = totals.total_products;
                run.generated_items = totals.generated_items;
                run.failed_items = totals.failed_items;
                run.avg_seo_score = totals.avg_seo_score;
                run.completed_at = Some(Utc::now());
                Ok(run.clone())
            }
            Some(_) => Err(StoreError::InvalidTransition {
                id: run_id,
                expected: "running",
            }),
            None => Err(StoreError::NotFound(format!("feed run {run_id}"))),
        }
    }
}

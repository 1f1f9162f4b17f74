//! Store contracts consumed by the sync engine.
//!
//! Every call takes the owning user explicitly; there is no ambient
//! "current user". Implementations live in `dropsync-db` (Postgres) and
//! `dropsync-engine` (in-memory).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::connectors::ConnectorType;
use crate::credentials::SupplierConnection;
use crate::feeds::{CategoryMapping, Feed, FeedGenerationRun, FeedItem, FeedRunTotals};
use crate::orders::{NormalizedOrder, SupplierOrder};
use crate::products::{CatalogEntry, NormalizedProduct};
use crate::sync_job::{JobProgress, JobStatus, NewSyncJob, SyncJob, SyncKind};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid state transition for {id}: expected status '{expected}'")]
    InvalidTransition { id: Uuid, expected: &'static str },
    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: Uuid,
    pub action: UpsertAction,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_external_id(
        &self,
        user_id: Uuid,
        supplier_name: &str,
        external_id: &str,
    ) -> Result<Option<CatalogEntry>, StoreError>;

    /// Most recently updated entry of `supplier_name` carrying `sku`.
    async fn find_by_sku(
        &self,
        user_id: Uuid,
        supplier_name: &str,
        sku: &str,
    ) -> Result<Option<CatalogEntry>, StoreError>;

    /// Inserts a new entry keyed by `(user_id, supplier_name, external_id)`.
    ///
    /// Must be atomic on that key: if a concurrent writer inserted the same
    /// key first, the existing row is overwritten and the outcome reports
    /// [`UpsertAction::Updated`]. Never produces two rows for one key.
    async fn insert(
        &self,
        user_id: Uuid,
        product: &NormalizedProduct,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Overwrites every mutable field of entry `id`, including its key
    /// columns. `id` and `created_at` are preserved.
    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        product: &NormalizedProduct,
    ) -> Result<(), StoreError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CatalogEntry>, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Creates the job directly in `running` status.
    async fn create_job(&self, job: &NewSyncJob) -> Result<SyncJob, StoreError>;

    /// Intermediate progress write. Only valid while the job is running.
    async fn update_job(
        &self,
        job_id: Uuid,
        progress: &JobProgress,
        error_details: &[String],
    ) -> Result<(), StoreError>;

    /// Moves a running job to a terminal `status`. Fails with
    /// [`StoreError::InvalidTransition`] if the job is no longer running.
    async fn finalize_job(
        &self,
        job_id: Uuid,
        status: JobStatus,
        progress: &JobProgress,
        error_details: &[String],
    ) -> Result<SyncJob, StoreError>;

    async fn get_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Option<SyncJob>, StoreError>;

    /// Most recent jobs first.
    async fn list_jobs(&self, user_id: Uuid, limit: u32) -> Result<Vec<SyncJob>, StoreError>;
}

/// Read-only from the engine's point of view.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_connection(
        &self,
        user_id: Uuid,
        supplier_id: &str,
    ) -> Result<Option<SupplierConnection>, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert-or-update keyed by `(user_id, supplier_name, external_order_id)`.
    async fn upsert_order(
        &self,
        user_id: Uuid,
        order: &NormalizedOrder,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn list_orders(&self, user_id: Uuid, limit: u32)
        -> Result<Vec<SupplierOrder>, StoreError>;
}

/// Summary of one finished run, written fire-and-forget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub description: String,
    pub metadata: serde_json::Value,
}

/// Per-supplier, per-day roll-up of sync outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierAnalytics {
    pub user_id: Uuid,
    pub supplier_id: String,
    pub connector: ConnectorType,
    pub kind: SyncKind,
    pub date: NaiveDate,
    pub total_records: u32,
    /// `success`, `partial` or `failed`.
    pub sync_status: String,
    pub last_sync_at: DateTime<Utc>,
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError>;

    async fn record_supplier_analytics(
        &self,
        analytics: &SupplierAnalytics,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn get_feed(&self, user_id: Uuid, feed_id: Uuid) -> Result<Option<Feed>, StoreError>;

    async fn category_mappings(&self, feed_id: Uuid) -> Result<Vec<CategoryMapping>, StoreError>;

    /// Insert-or-update keyed by `(feed_id, catalog_id)`.
    async fn upsert_feed_item(&self, item: &FeedItem) -> Result<(), StoreError>;

    async fn list_feed_items(&self, feed_id: Uuid, limit: u32)
        -> Result<Vec<FeedItem>, StoreError>;

    /// Deletes every item of `feed_id` whose catalog id is not in `keep`.
    /// Returns the number of items removed.
    async fn prune_feed_items(&self, feed_id: Uuid, keep: &[Uuid]) -> Result<u64, StoreError>;

    /// Creates a run in `running` status.
    async fn create_feed_run(&self, feed_id: Uuid) -> Result<FeedGenerationRun, StoreError>;

    async fn finalize_feed_run(
        &self,
        run_id: Uuid,
        status: JobStatus,
        totals: &FeedRunTotals,
    ) -> Result<FeedGenerationRun, StoreError>;
}

/// The full set of stores the engine writes through.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub jobs: Arc<dyn JobStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub orders: Arc<dyn OrderStore>,
    pub activity: Arc<dyn ActivityLog>,
    pub feeds: Arc<dyn FeedStore>,
}

impl Stores {
    /// Uses one backend for every store.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CatalogStore
            + JobStore
            + CredentialStore
            + OrderStore
            + ActivityLog
            + FeedStore
            + 'static,
    {
        Self {
            catalog: backend.clone(),
            jobs: backend.clone(),
            credentials: backend.clone(),
            orders: backend.clone(),
            activity: backend.clone(),
            feeds: backend,
        }
    }
}

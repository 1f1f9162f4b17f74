//! The sync control loop.
//!
//! One invocation: validate, create the job, fetch from the supplier,
//! normalize, filter, upsert every record through the deduplicator, and
//! finalize the job. A fetch failure is fatal to the run; anything that goes
//! wrong with a single record is counted against the job and the loop moves
//! on.
//!
//! Records are grouped by catalog key. Groups are processed concurrently by a
//! bounded pool; records inside a group are applied in adapter order, so the
//! last record for a key always wins. Once cancelled, no further group is
//! started and the groups in flight are drained.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dropsync_adapters::{
    normalize_order, normalize_product, AdapterRegistry, RawSupplierRecord, SupplierAdapter,
};
use dropsync_core::config::MAX_SYNC_WORKERS;
use dropsync_core::{
    AppConfig, CatalogKey, ConnectorType, FetchOptions, ImportFilters, NewSyncJob,
    NormalizedOrder, NormalizedProduct, Stores, SupplierCredentials, SyncJob, SyncKind,
    SyncSummary, UpsertAction,
};
use futures::future;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dedupe::{BatchKeys, Deduplicator};
use crate::error::SyncError;
use crate::report;
use crate::tracker::{JobTracker, TrackerSettings};

/// Number of error messages returned in a [`SyncSummary`].
pub const ERROR_SAMPLE_SIZE: usize = 10;

/// One sync invocation.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub user_id: Uuid,
    pub supplier_id: String,
    /// Taken from the stored connection when absent.
    pub connector: Option<ConnectorType>,
    /// Overrides the stored connection's display name.
    pub supplier_name: Option<String>,
    /// Inline credentials. Empty or absent means "use the stored connection".
    pub credentials: Option<SupplierCredentials>,
    pub options: FetchOptions,
    pub filters: ImportFilters,
    pub kind: SyncKind,
}

impl SyncRequest {
    #[must_use]
    pub fn products(user_id: Uuid, supplier_id: impl Into<String>) -> Self {
        Self {
            user_id,
            supplier_id: supplier_id.into(),
            connector: None,
            supplier_name: None,
            credentials: None,
            options: FetchOptions::default(),
            filters: ImportFilters::default(),
            kind: SyncKind::Products,
        }
    }

    #[must_use]
    pub fn orders(user_id: Uuid, supplier_id: impl Into<String>) -> Self {
        Self {
            kind: SyncKind::Orders,
            ..Self::products(user_id, supplier_id)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Concurrent record groups, clamped to `1..=16`.
    pub workers: usize,
    pub progress_batch: usize,
    pub error_detail_cap: usize,
    /// Cancels a run that has not finished in time. `None` disables it.
    pub timeout: Option<Duration>,
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            workers: config.sync_workers,
            progress_batch: config.sync_progress_batch,
            error_detail_cap: config.sync_error_detail_cap,
            timeout: config.sync_timeout(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            progress_batch: 25,
            error_detail_cap: 50,
            timeout: Some(Duration::from_secs(900)),
        }
    }
}

/// Validated inputs of a run.
struct Resolved {
    adapter: Arc<dyn SupplierAdapter>,
    connector: ConnectorType,
    credentials: SupplierCredentials,
    supplier_name: String,
}

/// A record after normalization and filtering.
enum Prepared {
    Product(NormalizedProduct),
    Order(NormalizedOrder),
    Failed(SyncError),
}

impl Prepared {
    fn key(&self) -> Option<CatalogKey> {
        match self {
            Prepared::Product(p) => Some(p.key()),
            Prepared::Order(o) => Some(CatalogKey {
                supplier_name: o.supplier_name.clone(),
                external_id: o.external_order_id.clone(),
            }),
            Prepared::Failed(_) => None,
        }
    }
}

/// Normalizes every raw record in adapter order. Records rejected by
/// `filters` are dropped and counted in the second return value.
fn prepare(
    records: Vec<RawSupplierRecord>,
    kind: SyncKind,
    supplier_name: &str,
    filters: &ImportFilters,
) -> (Vec<Prepared>, u32) {
    let mut prepared = Vec::with_capacity(records.len());
    let mut skipped: u32 = 0;

    for (index, raw) in records.iter().enumerate() {
        let label = || {
            raw.id_hint()
                .unwrap_or_else(|| format!("record #{}", index + 1))
        };
        let item = match kind {
            SyncKind::Products => match normalize_product(raw, supplier_name) {
                Ok(product) if !filters.accepts(&product) => {
                    tracing::debug!(
                        external_id = %product.external_id,
                        "product skipped by import filters"
                    );
                    skipped += 1;
                    continue;
                }
                Ok(product) => Prepared::Product(product),
                Err(e) => Prepared::Failed(SyncError::record(label(), e)),
            },
            SyncKind::Orders => match normalize_order(raw, supplier_name) {
                Ok(order) => Prepared::Order(order),
                Err(e) => Prepared::Failed(SyncError::record(label(), e)),
            },
        };
        prepared.push(item);
    }

    (prepared, skipped)
}

/// Groups records sharing a catalog key, keeping first-appearance order
/// between groups and adapter order inside each group.
fn group_by_key(prepared: Vec<Prepared>) -> Vec<Vec<Prepared>> {
    let mut groups: Vec<Vec<Prepared>> = Vec::new();
    let mut positions: HashMap<CatalogKey, usize> = HashMap::new();

    for item in prepared {
        match item.key() {
            Some(key) => {
                if let Some(&pos) = positions.get(&key) {
                    groups[pos].push(item);
                } else {
                    positions.insert(key, groups.len());
                    groups.push(vec![item]);
                }
            }
            None => groups.push(vec![item]),
        }
    }

    groups
}

async fn process_group(
    dedupe: &Deduplicator,
    user_id: Uuid,
    batch: &BatchKeys,
    group: Vec<Prepared>,
) -> Vec<Result<UpsertAction, SyncError>> {
    let mut results = Vec::with_capacity(group.len());
    for item in group {
        let result = match item {
            Prepared::Product(product) => dedupe
                .upsert_product(user_id, &product, batch)
                .await
                .map(|outcome| outcome.action)
                .map_err(|e| SyncError::record(product.external_id.clone(), e)),
            Prepared::Order(order) => dedupe
                .upsert_order(user_id, &order)
                .await
                .map(|outcome| outcome.action)
                .map_err(|e| SyncError::record(order.external_order_id.clone(), e)),
            Prepared::Failed(e) => Err(e),
        };
        results.push(result);
    }
    results
}

fn summarize(job: &SyncJob) -> SyncSummary {
    let p = &job.progress;
    SyncSummary {
        job_id: job.id,
        kind: job.kind,
        status: job.status,
        total: p.total,
        imported: p.inserted + p.updated,
        inserted: p.inserted,
        updated: p.updated,
        failed: p.failed,
        skipped: p.skipped,
        errors: job
            .error_details
            .iter()
            .take(ERROR_SAMPLE_SIZE)
            .cloned()
            .collect(),
    }
}

#[derive(Clone)]
pub struct SyncOrchestrator {
    adapters: AdapterRegistry,
    stores: Stores,
    dedupe: Deduplicator,
    settings: SyncSettings,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(adapters: AdapterRegistry, stores: Stores, settings: SyncSettings) -> Self {
        let dedupe = Deduplicator::new(stores.catalog.clone(), stores.orders.clone());
        Self {
            adapters,
            stores,
            dedupe,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Runs one sync, cancelling it when the configured timeout elapses.
    ///
    /// # Errors
    ///
    /// See [`SyncOrchestrator::run_with_cancel`].
    pub async fn run(&self, request: SyncRequest) -> Result<SyncSummary, SyncError> {
        let cancel = CancellationToken::new();
        let timer = self.settings.timeout.map(|limit| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                tracing::warn!(timeout_secs = limit.as_secs(), "sync run timed out");
                cancel.cancel();
            })
        });

        let result = self.run_with_cancel(request, &cancel).await;
        if let Some(timer) = timer {
            timer.abort();
        }
        result
    }

    /// Runs one sync until it finishes or `cancel` fires.
    ///
    /// A completed job is returned as `Ok` even when some records failed;
    /// the summary carries the counts and an error sample.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Validation`] for bad input (no job is created)
    /// - [`SyncError::Adapter`] when the supplier fetch fails (job `failed`)
    /// - [`SyncError::Cancelled`] when `cancel` fires first (job `cancelled`)
    /// - [`SyncError::Store`] when the job cannot be created or finalized
    pub async fn run_with_cancel(
        &self,
        request: SyncRequest,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        let resolved = self.validate(&request).await?;

        let new_job = NewSyncJob {
            user_id: request.user_id,
            supplier_id: request.supplier_id.clone(),
            supplier_name: resolved.supplier_name.clone(),
            connector: resolved.connector,
            kind: request.kind,
        };
        let mut tracker = JobTracker::start(
            self.stores.jobs.clone(),
            &new_job,
            TrackerSettings {
                progress_batch: self.settings.progress_batch,
                error_detail_cap: self.settings.error_detail_cap,
            },
        )
        .await?;
        let job_id = tracker.job_id();

        let fetch = async {
            match request.kind {
                SyncKind::Products => {
                    resolved
                        .adapter
                        .fetch_products(&resolved.credentials, &request.options)
                        .await
                }
                SyncKind::Orders => {
                    resolved
                        .adapter
                        .fetch_orders(&resolved.credentials, &request.options)
                        .await
                }
            }
        };
        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = fetch => Some(result),
        };

        let records = match fetched {
            None => return self.finish_cancelled(tracker).await,
            Some(Err(e)) => {
                tracing::error!(
                    job_id = %job_id,
                    supplier_id = %request.supplier_id,
                    error = %e,
                    "supplier fetch failed"
                );
                let job = tracker.fail(e.to_string()).await?;
                self.record_run_best_effort(&job).await;
                return Err(SyncError::Adapter { job_id, source: e });
            }
            Some(Ok(records)) => records,
        };
        tracing::info!(
            job_id = %job_id,
            fetched = records.len(),
            "supplier records fetched"
        );

        let (prepared, skipped) = prepare(
            records,
            request.kind,
            &resolved.supplier_name,
            &request.filters,
        );
        let total = u32::try_from(prepared.len()).unwrap_or(u32::MAX);
        tracker.set_total(total, skipped).await;

        let batch = BatchKeys::from_products(prepared.iter().filter_map(|item| match item {
            Prepared::Product(product) => Some(product),
            _ => None,
        }));
        let workers = self.settings.workers.clamp(1, MAX_SYNC_WORKERS);
        let user_id = request.user_id;
        let dedupe = &self.dedupe;
        let batch = &batch;
        // No group starts after cancellation; groups in flight are drained.
        let mut outcomes = std::pin::pin!(stream::iter(group_by_key(prepared))
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|group| process_group(dedupe, user_id, batch, group))
            .buffered(workers));

        while let Some(results) = outcomes.next().await {
            for result in results {
                match result {
                    Ok(action) => tracker.record_success(action).await,
                    Err(e) => {
                        tracing::warn!(job_id = %job_id, error = %e, "record failed");
                        tracker.record_failure(e.to_string()).await;
                    }
                }
            }
        }

        if tracker.progress().processed < total {
            return self.finish_cancelled(tracker).await;
        }

        let job = tracker.complete().await?;
        self.record_run_best_effort(&job).await;
        Ok(summarize(&job))
    }

    async fn finish_cancelled(&self, tracker: JobTracker) -> Result<SyncSummary, SyncError> {
        let job = tracker.cancel().await?;
        tracing::warn!(
            job_id = %job.id,
            processed = job.progress.processed,
            total = job.progress.total,
            "sync run cancelled"
        );
        self.record_run_best_effort(&job).await;
        Err(SyncError::Cancelled {
            job_id: job.id,
            processed: job.progress.processed,
            total: job.progress.total,
        })
    }

    async fn validate(&self, request: &SyncRequest) -> Result<Resolved, SyncError> {
        if request.supplier_id.trim().is_empty() {
            return Err(SyncError::Validation("supplierId is required".to_string()));
        }
        if request.options.limit == Some(0) {
            return Err(SyncError::Validation(
                "limit must be greater than zero".to_string(),
            ));
        }
        request
            .filters
            .validate()
            .map_err(SyncError::Validation)?;

        let stored = self
            .stores
            .credentials
            .get_connection(request.user_id, &request.supplier_id)
            .await?;

        let connector = match (request.connector, &stored) {
            (Some(requested), Some(conn)) if requested != conn.connector => {
                return Err(SyncError::Validation(format!(
                    "supplier '{}' is configured as {}, not {requested}",
                    request.supplier_id, conn.connector
                )));
            }
            (Some(requested), _) => requested,
            (None, Some(conn)) => conn.connector,
            (None, None) => {
                return Err(SyncError::Validation(format!(
                    "connectorType is required for unknown supplier '{}'",
                    request.supplier_id
                )));
            }
        };

        let info = connector.info();
        if request.kind == SyncKind::Orders && !info.supports_orders {
            return Err(SyncError::Validation(format!(
                "{} does not support order sync",
                info.name
            )));
        }
        let adapter = self.adapters.get(connector).ok_or_else(|| {
            SyncError::Validation(format!("no adapter registered for connector '{connector}'"))
        })?;

        let credentials = match (&request.credentials, &stored) {
            (Some(inline), _) if !inline.is_empty() => inline.clone(),
            (_, Some(conn)) => conn.credentials.clone(),
            _ => {
                return Err(SyncError::Validation(format!(
                    "no credentials supplied or stored for supplier '{}'",
                    request.supplier_id
                )));
            }
        };

        let supplier_name = request
            .supplier_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| stored.as_ref().map(|conn| conn.name.clone()))
            .unwrap_or_else(|| info.name.to_string());

        Ok(Resolved {
            adapter,
            connector,
            credentials,
            supplier_name,
        })
    }

    /// Analytics and activity rows. Failures are logged, never returned.
    async fn record_run_best_effort(&self, job: &SyncJob) {
        let analytics = report::supplier_analytics(job, Utc::now());
        if let Err(e) = self
            .stores
            .activity
            .record_supplier_analytics(&analytics)
            .await
        {
            tracing::warn!(job_id = %job.id, error = %e, "failed to record supplier analytics");
        }
        if let Err(e) = self
            .stores
            .activity
            .record_activity(&report::activity_entry(job))
            .await
        {
            tracing::warn!(job_id = %job.id, error = %e, "failed to record sync activity");
        }
    }

    /// Pull-based progress query for one job.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the read fails.
    pub async fn get_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Option<SyncJob>, SyncError> {
        Ok(self.stores.jobs.get_job(user_id, job_id).await?)
    }

    /// Most recent jobs first.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the read fails.
    pub async fn list_jobs(&self, user_id: Uuid, limit: u32) -> Result<Vec<SyncJob>, SyncError> {
        Ok(self.stores.jobs.list_jobs(user_id, limit).await?)
    }
}

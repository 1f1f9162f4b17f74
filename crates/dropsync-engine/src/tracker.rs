//! Job lifecycle and counters for one sync run.
//!
//! The job is created directly in `running` status. Counters are written
//! back every `progress_batch` records; a failed intermediate write is only
//! logged because the finalize call carries the exact totals anyway.

use std::sync::Arc;

use dropsync_core::{
    JobProgress, JobStatus, JobStore, NewSyncJob, StoreError, SyncJob, UpsertAction,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    /// Records between intermediate progress writes. `0` is treated as `1`.
    pub progress_batch: usize,
    /// Maximum number of messages kept in `error_details`.
    pub error_detail_cap: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            progress_batch: 25,
            error_detail_cap: 50,
        }
    }
}

pub struct JobTracker {
    jobs: Arc<dyn JobStore>,
    job_id: Uuid,
    progress: JobProgress,
    errors: Vec<String>,
    settings: TrackerSettings,
    unflushed: usize,
}

impl JobTracker {
    /// Creates the job record in `running` status.
    ///
    /// # Errors
    ///
    /// Returns the store error if the job cannot be created.
    pub async fn start(
        jobs: Arc<dyn JobStore>,
        job: &NewSyncJob,
        settings: TrackerSettings,
    ) -> Result<Self, StoreError> {
        let created = jobs.create_job(job).await?;
        tracing::info!(
            job_id = %created.id,
            supplier_id = %job.supplier_id,
            connector = %job.connector,
            kind = %job.kind,
            "sync job started"
        );
        Ok(Self {
            jobs,
            job_id: created.id,
            progress: JobProgress::default(),
            errors: Vec::new(),
            settings,
            unflushed: 0,
        })
    }

    #[must_use]
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    #[must_use]
    pub fn progress(&self) -> &JobProgress {
        &self.progress
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Records the size of the run and persists it immediately.
    pub async fn set_total(&mut self, total: u32, skipped: u32) {
        self.progress.total = total;
        self.progress.skipped = skipped;
        self.flush().await;
    }

    pub async fn record_success(&mut self, action: UpsertAction) {
        self.progress.processed += 1;
        self.progress.succeeded += 1;
        match action {
            UpsertAction::Inserted => self.progress.inserted += 1,
            UpsertAction::Updated => self.progress.updated += 1,
        }
        self.tick().await;
    }

    /// Counts a failed record. The message is kept only while under the cap;
    /// the counter is always exact.
    pub async fn record_failure(&mut self, message: String) {
        self.progress.processed += 1;
        self.progress.failed += 1;
        self.push_error(message);
        self.tick().await;
    }

    fn push_error(&mut self, message: String) {
        if self.errors.len() < self.settings.error_detail_cap {
            self.errors.push(message);
        }
    }

    async fn tick(&mut self) {
        self.unflushed += 1;
        if self.unflushed >= self.settings.progress_batch.max(1) {
            self.flush().await;
        }
    }

    /// Best-effort intermediate write.
    pub async fn flush(&mut self) {
        self.unflushed = 0;
        if let Err(e) = self
            .jobs
            .update_job(self.job_id, &self.progress, &self.errors)
            .await
        {
            tracing::warn!(job_id = %self.job_id, error = %e, "failed to write job progress");
        }
    }

    /// Finalizes the job as `completed`, whatever the failure count.
    ///
    /// # Errors
    ///
    /// Returns the store error if the final write fails.
    pub async fn complete(self) -> Result<SyncJob, StoreError> {
        debug_assert!(self.progress.is_consistent());
        debug_assert_eq!(self.progress.processed, self.progress.total);
        self.finish(JobStatus::Completed).await
    }

    /// Finalizes the job as `failed` with `message` as the causal error.
    ///
    /// # Errors
    ///
    /// Returns the store error if the final write fails.
    pub async fn fail(mut self, message: String) -> Result<SyncJob, StoreError> {
        self.push_error(message);
        self.finish(JobStatus::Failed).await
    }

    /// Finalizes the job as `cancelled` with the partial counts.
    ///
    /// # Errors
    ///
    /// Returns the store error if the final write fails.
    pub async fn cancel(self) -> Result<SyncJob, StoreError> {
        self.finish(JobStatus::Cancelled).await
    }

    async fn finish(self, status: JobStatus) -> Result<SyncJob, StoreError> {
        let job = self
            .jobs
            .finalize_job(self.job_id, status, &self.progress, &self.errors)
            .await?;
        tracing::info!(
            job_id = %job.id,
            status = %job.status,
            total = job.progress.total,
            succeeded = job.progress.succeeded,
            failed = job.progress.failed,
            skipped = job.progress.skipped,
            "sync job finalized"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use dropsync_core::{ConnectorType, SyncKind};

    use super::*;
    use crate::memory::MemoryStore;

    fn new_job(user_id: Uuid) -> NewSyncJob {
        NewSyncJob {
            user_id,
            supplier_id: "sup-1".to_string(),
            supplier_name: "Acme".to_string(),
            connector: ConnectorType::GenericJson,
            kind: SyncKind::Products,
        }
    }

    async fn start(store: &Arc<MemoryStore>, settings: TrackerSettings) -> (Uuid, JobTracker) {
        let user = Uuid::new_v4();
        let tracker = JobTracker::start(store.clone(), &new_job(user), settings)
            .await
            .unwrap();
        (user, tracker)
    }

    #[tokio::test]
    async fn job_is_running_as_soon_as_it_exists() {
        let store = Arc::new(MemoryStore::new());
        let (user, tracker) = start(&store, TrackerSettings::default()).await;

        let job = store.get_job(user, tracker.job_id()).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.completed_at.is_none());
    }

    #[tokio::test]
    async fn progress_is_flushed_in_batches() {
        let store = Arc::new(MemoryStore::new());
        let settings = TrackerSettings {
            progress_batch: 3,
            error_detail_cap: 10,
        };
        let (user, mut tracker) = start(&store, settings).await;
        tracker.set_total(5, 0).await;

        tracker.record_success(UpsertAction::Inserted).await;
        tracker.record_success(UpsertAction::Updated).await;
        let job = store.get_job(user, tracker.job_id()).await.unwrap().unwrap();
        assert_eq!(job.progress.processed, 0);

        tracker.record_failure("bad".to_string()).await;
        let job = store.get_job(user, tracker.job_id()).await.unwrap().unwrap();
        assert_eq!(job.progress.processed, 3);
        assert_eq!(job.progress.failed, 1);
    }

    #[tokio::test]
    async fn final_counts_are_exact_and_details_capped() {
        let store = Arc::new(MemoryStore::new());
        let settings = TrackerSettings {
            progress_batch: 100,
            error_detail_cap: 2,
        };
        let (_, mut tracker) = start(&store, settings).await;
        tracker.set_total(7, 1).await;
        for i in 0..5 {
            tracker.record_failure(format!("record {i}")).await;
        }
        tracker.record_success(UpsertAction::Inserted).await;
        tracker.record_success(UpsertAction::Inserted).await;

        let job = tracker.complete().await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress.processed, 7);
        assert_eq!(job.progress.succeeded + job.progress.failed, 7);
        assert_eq!(job.progress.failed, 5);
        assert_eq!(job.progress.skipped, 1);
        assert_eq!(job.error_details, vec!["record 0", "record 1"]);
    }

    #[tokio::test]
    async fn fail_records_causal_error() {
        let store = Arc::new(MemoryStore::new());
        let (_, tracker) = start(&store, TrackerSettings::default()).await;

        let job = tracker.fail("HTTP 401".to_string()).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_details, vec!["HTTP 401"]);
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn finalized_job_rejects_further_writes() {
        let store = Arc::new(MemoryStore::new());
        let (_, tracker) = start(&store, TrackerSettings::default()).await;
        let job_id = tracker.job_id();
        tracker.cancel().await.unwrap();

        let err = store
            .finalize_job(job_id, JobStatus::Completed, &JobProgress::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }
}

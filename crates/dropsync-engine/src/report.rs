//! Activity and analytics rows written after a job is finalized.

use chrono::{DateTime, Utc};
use dropsync_core::{ActivityEntry, JobStatus, SupplierAnalytics, SyncJob};

/// `success` when every record succeeded, `partial` when some did, and
/// `failed` otherwise.
#[must_use]
pub fn analytics_status(job: &SyncJob) -> &'static str {
    let progress = &job.progress;
    match job.status {
        JobStatus::Completed if progress.failed == 0 => "success",
        _ if progress.succeeded > 0 => "partial",
        _ => "failed",
    }
}

#[must_use]
pub fn supplier_analytics(job: &SyncJob, now: DateTime<Utc>) -> SupplierAnalytics {
    let finished = job.completed_at.unwrap_or(now);
    SupplierAnalytics {
        user_id: job.user_id,
        supplier_id: job.supplier_id.clone(),
        connector: job.connector,
        kind: job.kind,
        date: finished.date_naive(),
        total_records: job.progress.succeeded,
        sync_status: analytics_status(job).to_string(),
        last_sync_at: finished,
    }
}

#[must_use]
pub fn activity_entry(job: &SyncJob) -> ActivityEntry {
    let p = &job.progress;
    ActivityEntry {
        user_id: job.user_id,
        action: "supplier_sync".to_string(),
        entity_type: "sync_job".to_string(),
        entity_id: job.id.to_string(),
        description: format!(
            "{} sync from {} {}: {} imported, {} failed, {} skipped",
            job.kind,
            job.supplier_name,
            job.status,
            p.inserted + p.updated,
            p.failed,
            p.skipped
        ),
        metadata: serde_json::json!({
            "jobId": job.id,
            "supplierId": job.supplier_id,
            "connector": job.connector,
            "status": job.status,
            "total": p.total,
            "inserted": p.inserted,
            "updated": p.updated,
            "failed": p.failed,
            "skipped": p.skipped,
        }),
    }
}

#[cfg(test)]
mod tests {
    use dropsync_core::{ConnectorType, JobProgress, SyncKind};
    use uuid::Uuid;

    use super::*;

    fn job(status: JobStatus, succeeded: u32, failed: u32) -> SyncJob {
        SyncJob {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            supplier_id: "cj-main".to_string(),
            supplier_name: "CJ".to_string(),
            connector: ConnectorType::CjDropshipping,
            kind: SyncKind::Products,
            status,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            progress: JobProgress {
                total: succeeded + failed,
                processed: succeeded + failed,
                succeeded,
                failed,
                inserted: succeeded,
                ..JobProgress::default()
            },
            error_details: vec![],
        }
    }

    #[test]
    fn status_reflects_failure_mix() {
        assert_eq!(analytics_status(&job(JobStatus::Completed, 5, 0)), "success");
        assert_eq!(analytics_status(&job(JobStatus::Completed, 5, 2)), "partial");
        assert_eq!(analytics_status(&job(JobStatus::Completed, 0, 3)), "failed");
        assert_eq!(analytics_status(&job(JobStatus::Cancelled, 2, 0)), "partial");
        assert_eq!(analytics_status(&job(JobStatus::Failed, 0, 0)), "failed");
    }

    #[test]
    fn activity_summarizes_counts() {
        let entry = activity_entry(&job(JobStatus::Completed, 9, 1));
        assert_eq!(entry.entity_type, "sync_job");
        assert_eq!(
            entry.description,
            "products sync from CJ completed: 9 imported, 1 failed, 0 skipped"
        );
        assert_eq!(entry.metadata["failed"], 1);
        assert_eq!(entry.metadata["connector"], "cjdropshipping");
    }

    #[test]
    fn analytics_count_successful_records() {
        let analytics = supplier_analytics(&job(JobStatus::Completed, 4, 1), Utc::now());
        assert_eq!(analytics.total_records, 4);
        assert_eq!(analytics.sync_status, "partial");
    }
}

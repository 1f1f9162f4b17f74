use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connectors::ConnectorType;
use crate::CoreError;

/// Lifecycle of a sync job: `pending -> running -> {completed, failed, cancelled}`.
///
/// Terminal states are never left again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(CoreError::UnknownJobStatus(other.to_string())),
        }
    }
}

/// What a sync run pulls from the supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    #[default]
    Products,
    Orders,
}

impl SyncKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncKind::Products => "products",
            SyncKind::Orders => "orders",
        }
    }
}

impl std::fmt::Display for SyncKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(SyncKind::Products),
            "orders" => Ok(SyncKind::Orders),
            other => Err(CoreError::UnknownSyncKind(other.to_string())),
        }
    }
}

/// Record counters for one job.
///
/// At finalization of a completed job,
/// `processed == succeeded + failed == total` holds exactly. `skipped`
/// counts records removed by import filters before they entered the
/// pipeline and is not part of `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    #[serde(rename = "totalRecords")]
    pub total: u32,
    #[serde(rename = "processedRecords")]
    pub processed: u32,
    #[serde(rename = "successfulRecords")]
    pub succeeded: u32,
    #[serde(rename = "failedRecords")]
    pub failed: u32,
    #[serde(rename = "skippedRecords")]
    pub skipped: u32,
    #[serde(rename = "insertedRecords")]
    pub inserted: u32,
    #[serde(rename = "updatedRecords")]
    pub updated: u32,
}

impl JobProgress {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.processed == self.succeeded + self.failed
    }
}

/// Input for creating a job record.
#[derive(Debug, Clone)]
pub struct NewSyncJob {
    pub user_id: Uuid,
    pub supplier_id: String,
    pub supplier_name: String,
    pub connector: ConnectorType,
    pub kind: SyncKind,
}

/// One record per orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub supplier_id: String,
    pub supplier_name: String,
    #[serde(rename = "connectorType")]
    pub connector: ConnectorType,
    pub kind: SyncKind,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub progress: JobProgress,
    /// Ordered per-record failure messages, capped; `progress.failed` is exact.
    pub error_details: Vec<String>,
}

/// What a sync invocation reports back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub job_id: Uuid,
    pub kind: SyncKind,
    pub status: JobStatus,
    pub total: u32,
    /// `inserted + updated`.
    pub imported: u32,
    pub inserted: u32,
    pub updated: u32,
    pub failed: u32,
    pub skipped: u32,
    /// Leading sample of per-record errors.
    pub errors: Vec<String>,
}

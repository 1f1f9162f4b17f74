use dropsync_adapters::AdapterError;
use dropsync_core::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Failures of a sync invocation.
///
/// Only [`SyncError::Record`] is recoverable: it is produced inside the
/// per-record loop, counted against the job and never returned to the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad input. Raised before any job record exists.
    #[error("invalid sync request: {0}")]
    Validation(String),

    /// The supplier fetch failed; the job was finalized as `failed`.
    #[error("supplier fetch failed (job {job_id}): {source}")]
    Adapter {
        job_id: Uuid,
        #[source]
        source: AdapterError,
    },

    #[error("{label}: {reason}")]
    Record { label: String, reason: String },

    /// Job creation or finalization failed, or a read the run depends on.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The run was cancelled and the job finalized as `cancelled`.
    #[error("sync job {job_id} was cancelled after {processed} of {total} records")]
    Cancelled {
        job_id: Uuid,
        processed: u32,
        total: u32,
    },
}

impl SyncError {
    pub(crate) fn record(label: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SyncError::Record {
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    /// Id of the job this error finalized, when one was created.
    #[must_use]
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            SyncError::Adapter { job_id, .. } | SyncError::Cancelled { job_id, .. } => {
                Some(*job_id)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed {0} not found")]
    NotFound(Uuid),

    /// A single catalog product could not be turned into a feed item.
    #[error("cannot build feed item for {sku}: {reason}")]
    Item { sku: String, reason: String },

    #[error("failed to render feed export: {0}")]
    Export(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_formats_label_and_reason() {
        let err = SyncError::record("A1", "price is not a number");
        assert_eq!(err.to_string(), "A1: price is not a number");
        assert_eq!(err.job_id(), None);
    }

    #[test]
    fn cancelled_carries_job_id() {
        let job_id = Uuid::new_v4();
        let err = SyncError::Cancelled {
            job_id,
            processed: 3,
            total: 10,
        };
        assert_eq!(err.job_id(), Some(job_id));
        assert!(err.to_string().contains("after 3 of 10 records"));
    }
}

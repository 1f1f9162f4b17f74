use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use dropsync_core::SyncJob;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{RequestId, UserId};

use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SyncJobsQuery {
    pub limit: Option<u32>,
}

/// Most recent jobs of the caller first.
pub(super) async fn list_sync_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(UserId(user_id)): Extension<UserId>,
    Query(query): Query<SyncJobsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncJob>>>, ApiError> {
    let jobs = state
        .orchestrator
        .list_jobs(user_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: jobs,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Pull-based progress for one job.
pub(super) async fn get_sync_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SyncJob>>, ApiError> {
    let job = state
        .orchestrator
        .get_job(user_id, job_id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("sync job {job_id} not found"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: job,
        meta: ResponseMeta::new(req_id.0),
    }))
}

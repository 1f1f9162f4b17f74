//! `POST /api/v1/sync`: the synchronous trigger.
//!
//! Unlike the other routes this one answers with the flat
//! `{success, syncJobId, results}` envelope sync clients expect, and
//! `{success: false, error}` on a fatal failure.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use dropsync_core::{
    ConnectorType, FetchOptions, ImportFilters, SupplierCredentials, SyncKind, SyncSummary,
};
use dropsync_engine::{SyncError, SyncRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{RequestId, UserId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncRequestBody {
    #[serde(default)]
    supplier_id: String,
    connector_type: Option<String>,
    supplier_name: Option<String>,
    credentials: Option<SupplierCredentials>,
    #[serde(default)]
    options: SyncOptionsBody,
    /// `products` (default) or `orders`.
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncOptionsBody {
    limit: Option<u32>,
    page: Option<u32>,
    category: Option<String>,
    #[serde(default)]
    filters: ImportFilters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncResults {
    total: u32,
    imported: u32,
    inserted: u32,
    updated: u32,
    failed: u32,
    skipped: u32,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncResponse {
    success: bool,
    sync_job_id: Uuid,
    results: SyncResults,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncFailure {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_job_id: Option<Uuid>,
}

impl From<SyncSummary> for SyncResponse {
    fn from(summary: SyncSummary) -> Self {
        Self {
            success: true,
            sync_job_id: summary.job_id,
            results: SyncResults {
                total: summary.total,
                imported: summary.imported,
                inserted: summary.inserted,
                updated: summary.updated,
                failed: summary.failed,
                skipped: summary.skipped,
                errors: summary.errors,
            },
        }
    }
}

fn failure(
    status: StatusCode,
    error: String,
    sync_job_id: Option<Uuid>,
) -> axum::response::Response {
    (
        status,
        Json(SyncFailure {
            success: false,
            error,
            sync_job_id,
        }),
    )
        .into_response()
}

/// Parses the body into an engine request. Errors are user-facing messages.
fn into_request(user_id: Uuid, body: SyncRequestBody) -> Result<SyncRequest, String> {
    let connector = body
        .connector_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<ConnectorType>)
        .transpose()
        .map_err(|e| e.to_string())?;
    let kind = body
        .kind
        .as_deref()
        .map(str::parse::<SyncKind>)
        .transpose()
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    Ok(SyncRequest {
        user_id,
        supplier_id: body.supplier_id,
        connector,
        supplier_name: body.supplier_name,
        credentials: body.credentials,
        options: FetchOptions {
            limit: body.options.limit,
            page: body.options.page,
            category: body.options.category,
        },
        filters: body.options.filters,
        kind,
    })
}

fn status_for(error: &SyncError) -> StatusCode {
    match error {
        SyncError::Validation(_) => StatusCode::BAD_REQUEST,
        SyncError::Adapter { .. } => StatusCode::BAD_GATEWAY,
        SyncError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
        SyncError::Record { .. } | SyncError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(super) async fn trigger_sync(
    State(state): State<super::AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<SyncRequestBody>,
) -> axum::response::Response {
    let request = match into_request(user_id, body) {
        Ok(request) => request,
        Err(message) => return failure(StatusCode::BAD_REQUEST, message, None),
    };
    let supplier_id = request.supplier_id.clone();

    match state.orchestrator.run(request).await {
        Ok(summary) => (StatusCode::OK, Json(SyncResponse::from(summary))).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(
                    request_id = %req_id.0,
                    supplier_id = %supplier_id,
                    error = %e,
                    "sync failed"
                );
            }
            let message = match &e {
                SyncError::Store(_) => "sync job could not be recorded".to_string(),
                other => other.to_string(),
            };
            failure(status, message, e.job_id())
        }
    }
}

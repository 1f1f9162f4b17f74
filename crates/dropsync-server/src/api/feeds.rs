use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use dropsync_core::{FeedGenerationRun, FeedItem};
use dropsync_engine::FeedError;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{RequestId, UserId};

use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct FeedItemsQuery {
    pub limit: Option<u32>,
}

fn map_feed_error(request_id: String, error: &FeedError) -> ApiError {
    match error {
        FeedError::NotFound(id) => {
            ApiError::new(request_id, "not_found", format!("feed {id} not found"))
        }
        other => map_store_error(request_id, other),
    }
}

pub(super) async fn generate_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(feed_id): Path<Uuid>,
) -> Result<Json<ApiResponse<FeedGenerationRun>>, ApiError> {
    let run = state
        .feeds
        .generate(user_id, feed_id)
        .await
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: run,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Items of a feed, best quality score first.
pub(super) async fn list_feed_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(feed_id): Path<Uuid>,
    Query(query): Query<FeedItemsQuery>,
) -> Result<Json<ApiResponse<Vec<FeedItem>>>, ApiError> {
    let items = state
        .feeds
        .items(user_id, feed_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// The feed as an RSS document with Google Shopping fields.
pub(super) async fn export_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(feed_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let xml = state
        .feeds
        .export(user_id, feed_id)
        .await
        .map_err(|e| map_feed_error(req_id.0, &e))?;

    Ok((
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        xml,
    )
        .into_response())
}

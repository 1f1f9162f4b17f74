use axum::{Extension, Json};
use dropsync_core::{connector_catalog, ConnectorInfo};

use crate::middleware::RequestId;

use super::{ApiResponse, ResponseMeta};

pub(super) async fn list_connectors(
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<&'static [ConnectorInfo]>> {
    Json(ApiResponse {
        data: connector_catalog(),
        meta: ResponseMeta::new(req_id.0),
    })
}

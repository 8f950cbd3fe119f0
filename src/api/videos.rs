//! Upload endpoint.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
};

use super::{success, ApiResult};
use crate::gallery::VideoFile;
use crate::models::{NodeId, UploadQuery};
use crate::AppState;

const FALLBACK_MIME: &str = "application/octet-stream";

/// POST /api/clients/{client_id}/folders/{folder_id}/videos?name=&date=
///
/// The request body is the file itself and `Content-Type` its MIME type. An
/// empty body or missing name counts as no file selected.
pub async fn upload_video(
    State(state): State<AppState>,
    Path((client_id, folder_id)): Path<(NodeId, NodeId)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<NodeId> {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(FALLBACK_MIME)
        .to_string();

    let file = query
        .name
        .filter(|name| !name.trim().is_empty() && !body.is_empty())
        .map(|name| VideoFile {
            name,
            mime_type,
            payload: body,
        });
    let date = query.date.unwrap_or_default();

    success(
        state
            .gallery
            .upload_video(client_id, folder_id, file, &date)
            .await?,
    )
}

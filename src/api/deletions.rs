//! Two-step deletion endpoints.
//!
//! `DELETE` on a node only issues a confirmation ticket; the page shows the
//! ticket's prompt and then confirms or cancels it.

use axum::extract::{Path, State};
use uuid::Uuid;

use super::{success, ApiResult};
use crate::gallery::{DeletionTarget, PendingDeletion};
use crate::models::NodeId;
use crate::AppState;

/// DELETE /api/clients/{client_id}
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<NodeId>,
) -> ApiResult<PendingDeletion> {
    success(
        state
            .gallery
            .request_delete(DeletionTarget::Client { client_id })
            .await?,
    )
}

/// DELETE /api/clients/{client_id}/folders/{folder_id}
pub async fn delete_folder(
    State(state): State<AppState>,
    Path((client_id, folder_id)): Path<(NodeId, NodeId)>,
) -> ApiResult<PendingDeletion> {
    success(
        state
            .gallery
            .request_delete(DeletionTarget::Folder {
                client_id,
                folder_id,
            })
            .await?,
    )
}

/// DELETE /api/clients/{client_id}/folders/{folder_id}/videos/{video_key}
pub async fn delete_video(
    State(state): State<AppState>,
    Path((client_id, folder_id, video_key)): Path<(NodeId, NodeId, NodeId)>,
) -> ApiResult<PendingDeletion> {
    success(
        state
            .gallery
            .request_delete(DeletionTarget::Video {
                client_id,
                folder_id,
                video_key,
            })
            .await?,
    )
}

/// POST /api/confirmations/{token} - Run the deletion.
pub async fn confirm_deletion(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> ApiResult<DeletionTarget> {
    success(state.gallery.confirm_delete(token).await?)
}

/// DELETE /api/confirmations/{token} - Drop the ticket.
pub async fn cancel_deletion(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> ApiResult<()> {
    state.gallery.cancel_delete(token).await?;
    success(())
}

//! Gallery tree endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{CreateNamedRequest, GalleryView, NodeId};
use crate::AppState;

/// GET /api/gallery - Tree for the current session mode.
pub async fn get_gallery(State(state): State<AppState>) -> ApiResult<GalleryView> {
    success(state.gallery.view().await)
}

/// POST /api/clients - Add a client with its default folder.
pub async fn create_client(
    State(state): State<AppState>,
    Json(request): Json<CreateNamedRequest>,
) -> ApiResult<NodeId> {
    success(state.gallery.add_client(&request.name).await?)
}

/// POST /api/clients/{client_id}/folders - Add a folder.
pub async fn create_folder(
    State(state): State<AppState>,
    Path(client_id): Path<NodeId>,
    Json(request): Json<CreateNamedRequest>,
) -> ApiResult<NodeId> {
    success(state.gallery.add_folder(client_id, &request.name).await?)
}

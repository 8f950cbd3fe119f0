//! Snapshots handed to the presentation layer.

use serde::{Deserialize, Serialize};

use super::{Client, NodeId, Video};

/// Which tree the presentation layer is rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Owner,
    Viewer,
}

/// Rendering snapshot of the whole gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryView {
    pub mode: ViewMode,
    pub clients: Vec<ClientView>,
}

/// Client as rendered. Ids are only exposed in owner mode, where they address
/// mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub name: String,
    pub folders: Vec<FolderView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub name: String,
    pub videos: Vec<VideoView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub size: u64,
    pub date: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub is_portrait: bool,
    /// Absent when the payload could not be loaded
    pub playback_url: Option<String>,
}

impl GalleryView {
    pub fn build(mode: ViewMode, clients: &[Client]) -> Self {
        let owner = mode == ViewMode::Owner;
        let clients = clients
            .iter()
            .map(|client| ClientView {
                id: owner.then_some(client.id),
                name: client.name.clone(),
                folders: client
                    .folders
                    .iter()
                    .map(|folder| FolderView {
                        id: owner.then_some(folder.id),
                        name: folder.name.clone(),
                        videos: folder
                            .videos
                            .iter()
                            .map(|video| VideoView::build(video, owner))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self { mode, clients }
    }
}

impl VideoView {
    fn build(video: &Video, owner: bool) -> Self {
        Self {
            key: owner.then_some(video.key),
            id: if owner { video.id.clone() } else { None },
            name: video.name.clone(),
            size: video.size,
            date: video.date.clone(),
            mime_type: video.mime_type.clone(),
            is_portrait: video.is_portrait,
            playback_url: video.playback.map(|p| p.url()),
        }
    }
}

/// Body for `POST /api/clients` and `POST /api/clients/{id}/folders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNamedRequest {
    #[serde(default)]
    pub name: String,
}

/// Body for `POST /api/session/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub passphrase: String,
}

/// Session state plus the inline message shown next to the login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub is_owner: bool,
    pub message: String,
}

/// Query string of the upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Storage availability reported after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub binary_store_ready: bool,
    pub notice: Option<String>,
}

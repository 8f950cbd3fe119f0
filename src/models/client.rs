//! Client and folder records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Video;

/// Session-scoped identifier for clients and folders.
///
/// Assigned on creation or load and never persisted, so the saved layout stays
/// `{ name, folders }` / `{ name, videos }`.
pub type NodeId = Uuid;

pub(crate) fn new_node_id() -> NodeId {
    Uuid::new_v4()
}

/// A client owning an ordered list of folders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[serde(skip, default = "new_node_id")]
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

impl Client {
    /// New client with the single default folder `"<name> Videos"`.
    pub fn new(name: &str) -> Self {
        Self {
            id: new_node_id(),
            name: name.to_string(),
            folders: vec![Folder::new(&format!("{} Videos", name))],
        }
    }

    pub fn folder_position(&self, folder_id: NodeId) -> Option<usize> {
        self.folders.iter().position(|f| f.id == folder_id)
    }

    /// Every persisted video id below this client.
    pub fn video_ids(&self) -> Vec<String> {
        self.folders.iter().flat_map(Folder::video_ids).collect()
    }
}

/// A named folder holding videos sorted newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    #[serde(skip, default = "new_node_id")]
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub videos: Vec<Video>,
}

impl Folder {
    pub fn new(name: &str) -> Self {
        Self {
            id: new_node_id(),
            name: name.to_string(),
            videos: Vec::new(),
        }
    }

    /// Ids of videos that have a payload in the binary store. Legacy records
    /// without an id are left out.
    pub fn video_ids(&self) -> Vec<String> {
        self.videos
            .iter()
            .filter_map(|v| v.id.clone())
            .filter(|id| !id.is_empty())
            .collect()
    }

    pub fn video_position(&self, key: NodeId) -> Option<usize> {
        self.videos.iter().position(|v| v.key == key)
    }

    /// Insert and restore newest-first ordering.
    pub fn insert_video(&mut self, video: Video) {
        self.videos.push(video);
        self.videos
            .sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    }
}

//! The gallery context: the in-memory client tree kept in step with both stores.
//!
//! Mutations are owner-gated and address nodes by session-scoped id. Each one
//! that succeeds rewrites the whole `clients` entry. Store failures are
//! logged and absorbed here so the gallery keeps working without persistence.
//!
//! A saved tree that cannot be read is never written over: if it could not be
//! set aside, saving stays off until the next successful load.
//!
//! Deletions cascade to the binary store on a best-effort basis: a payload that
//! fails to delete is logged and the structural removal still goes ahead. No
//! rollback is attempted.

mod playback;

pub use playback::*;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{LoginOutcome, SessionGate, SessionState};
use crate::db::{BinaryStore, MetadataStore};
use crate::errors::{AppError, AppResult};
use crate::media::probe_dimensions;
use crate::models::{Client, Folder, GalleryView, NodeId, PlaybackRef, Video, ViewMode};

/// An uploaded file as received from the presentation layer.
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub name: String,
    pub mime_type: String,
    pub payload: Bytes,
}

/// Node a deletion ticket points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DeletionTarget {
    #[serde(rename_all = "camelCase")]
    Client { client_id: NodeId },
    #[serde(rename_all = "camelCase")]
    Folder { client_id: NodeId, folder_id: NodeId },
    #[serde(rename_all = "camelCase")]
    Video {
        client_id: NodeId,
        folder_id: NodeId,
        video_key: NodeId,
    },
}

impl DeletionTarget {
    /// Question put to the user before the deletion runs.
    pub fn prompt(&self) -> &'static str {
        match self {
            DeletionTarget::Client { .. } => {
                "Are you sure you want to delete this client and all their folders/videos?"
            }
            DeletionTarget::Folder { .. } => {
                "Are you sure you want to delete this folder and all its videos?"
            }
            DeletionTarget::Video { .. } => "Are you sure you want to delete this video?",
        }
    }
}

/// First half of a deletion: nothing has been removed yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeletion {
    pub token: Uuid,
    pub target: DeletionTarget,
    pub prompt: String,
}

/// Owns the client tree, the session gate and the stores for the lifetime of
/// the process.
pub struct Gallery {
    tree: Mutex<Vec<Client>>,
    session: SessionGate,
    binary: Arc<dyn BinaryStore>,
    metadata: Arc<dyn MetadataStore>,
    playback: PlaybackRegistry,
    pending: Mutex<HashMap<Uuid, DeletionTarget>>,
    /// Video ids handed out to uploads that are not in the tree yet
    uploading: Mutex<HashSet<String>>,
    /// Cleared when the saved tree could be neither read nor set aside
    writable: AtomicBool,
}

impl Gallery {
    /// Restore the session, read the saved tree and attach playback references.
    pub async fn start(
        binary: Arc<dyn BinaryStore>,
        metadata: Arc<dyn MetadataStore>,
        passphrase: impl Into<String>,
    ) -> Self {
        let session = SessionGate::restore(metadata.clone(), passphrase).await;

        let gallery = Self {
            tree: Mutex::new(Vec::new()),
            session,
            binary,
            metadata,
            playback: PlaybackRegistry::new(),
            pending: Mutex::new(HashMap::new()),
            uploading: Mutex::new(HashSet::new()),
            writable: AtomicBool::new(true),
        };
        gallery.load().await;
        gallery
    }

    /// Replace the in-memory tree with the saved one and resolve a playback
    /// reference for every video whose payload can be found.
    pub async fn load(&self) {
        tracing::info!("Loading gallery...");

        let mut clients = match self.metadata.load_clients().await {
            Ok(clients) => {
                self.writable.store(true, Ordering::SeqCst);
                clients
            }
            Err(e) => {
                tracing::error!(
                    "Could not read client tree, starting empty with saving disabled: {}",
                    e
                );
                self.writable.store(false, Ordering::SeqCst);
                Vec::new()
            }
        };

        let mut tree = self.tree.lock().await;
        for video in tree.iter().flat_map(|c| &c.folders).flat_map(|f| &f.videos) {
            if let Some(playback) = video.playback {
                self.playback.release(playback).await;
            }
        }

        let jobs = clients
            .iter_mut()
            .flat_map(|c| c.folders.iter_mut())
            .flat_map(|f| f.videos.iter_mut())
            .map(|video| self.attach_playback(video));
        futures::future::join_all(jobs).await;

        *tree = clients;
        // Tickets address the ids of the tree being replaced.
        self.pending.lock().await.clear();
        tracing::info!("Gallery loaded with {} clients", tree.len());
    }

    async fn attach_playback(&self, video: &mut Video) {
        let Some(id) = video.id.clone().filter(|id| !id.is_empty()) else {
            tracing::warn!("Old video without ID found, skipping: {}", video.name);
            return;
        };

        match self.binary.size(&id).await {
            Ok(Some(_)) => {
                video.playback = Some(
                    self.playback
                        .register(PlaybackSource::Stored(id), &video.mime_type)
                        .await,
                );
            }
            Ok(None) => tracing::warn!("Video file not found for ID: {}", id),
            Err(e) => tracing::warn!("Could not load video {}: {}", id, e),
        }
    }

    /// Whether payloads can currently be persisted. Retries a store that was
    /// unavailable earlier.
    pub async fn binary_store_ready(&self) -> bool {
        self.binary.open().await.is_ok()
    }

    // ==================== SESSION ====================

    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    pub async fn login(&self, passphrase: &str) -> LoginOutcome {
        self.session.login(passphrase).await
    }

    pub async fn logout(&self) {
        self.session.logout().await
    }

    // ==================== VIEWS ====================

    /// Tree for the current session mode.
    pub async fn view(&self) -> GalleryView {
        match self.session.state().await {
            SessionState::Owner => self.owner_view().await,
            SessionState::Viewer => self.viewer_view().await,
        }
    }

    /// Full tree including the ids that address mutations.
    pub async fn owner_view(&self) -> GalleryView {
        GalleryView::build(ViewMode::Owner, &self.tree.lock().await)
    }

    /// Read-only tree without ids.
    pub async fn viewer_view(&self) -> GalleryView {
        GalleryView::build(ViewMode::Viewer, &self.tree.lock().await)
    }

    /// Length and type of the payload behind a playback reference handed out
    /// in a view, `None` once the reference or its payload is gone.
    pub async fn media_info(&self, playback: PlaybackRef) -> AppResult<Option<MediaInfo>> {
        let Some(entry) = self.playback.get(playback).await else {
            return Ok(None);
        };

        let size = match &entry.source {
            PlaybackSource::Stored(id) => self.binary.size(id).await?,
            PlaybackSource::Detached(payload) => Some(payload.len() as u64),
        };
        Ok(size.map(|size| MediaInfo {
            size,
            mime_type: entry.mime_type,
        }))
    }

    /// Bytes behind a playback reference; the whole payload without a range.
    pub async fn media_bytes(
        &self,
        playback: PlaybackRef,
        range: Option<Range<u64>>,
    ) -> AppResult<Option<Bytes>> {
        let Some(entry) = self.playback.get(playback).await else {
            return Ok(None);
        };

        match (entry.source, range) {
            (PlaybackSource::Stored(id), None) => self.binary.get(&id).await,
            (PlaybackSource::Stored(id), Some(range)) => self.binary.get_range(&id, range).await,
            (PlaybackSource::Detached(payload), None) => Ok(Some(payload)),
            (PlaybackSource::Detached(payload), Some(range)) => {
                let end = range.end.min(payload.len() as u64);
                let start = range.start.min(end);
                Ok(Some(payload.slice(start as usize..end as usize)))
            }
        }
    }

    // ==================== MUTATIONS ====================

    /// Append a client with its default folder.
    pub async fn add_client(&self, name: &str) -> AppResult<NodeId> {
        self.session.require_owner().await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Client name is required".to_string()));
        }

        let mut tree = self.tree.lock().await;
        let client = Client::new(name);
        let id = client.id;
        tree.push(client);
        self.persist(&tree).await;

        tracing::info!("Client added: {}", name);
        Ok(id)
    }

    /// Append an empty folder to a client.
    pub async fn add_folder(&self, client_id: NodeId, name: &str) -> AppResult<NodeId> {
        self.session.require_owner().await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Folder name is required".to_string()));
        }

        let mut tree = self.tree.lock().await;
        let ci = client_position(&tree, client_id)?;
        let folder = Folder::new(name);
        let id = folder.id;
        tree[ci].folders.push(folder);
        self.persist(&tree).await;

        tracing::info!("Folder added: {}", name);
        Ok(id)
    }

    /// Store the payload, work out its orientation, then insert the record
    /// into the folder newest first.
    ///
    /// The tree is only locked to pick the id and to insert the record, so
    /// views stay responsive while a large payload is written.
    pub async fn upload_video(
        &self,
        client_id: NodeId,
        folder_id: NodeId,
        file: Option<VideoFile>,
        date: &str,
    ) -> AppResult<NodeId> {
        self.session.require_owner().await?;

        let date = date.trim();
        let Some(file) = file else {
            return Err(AppError::Validation("A video file is required".to_string()));
        };
        if date.is_empty() {
            return Err(AppError::Validation("A date is required".to_string()));
        }

        let id = {
            let tree = self.tree.lock().await;
            let (ci, fi) = folder_position(&tree, client_id, folder_id)?;
            let mut uploading = self.uploading.lock().await;
            let id = unique_video_id(&tree, &uploading, ci, fi);
            uploading.insert(id.clone());
            id
        };

        let result = self
            .store_upload(client_id, folder_id, id.clone(), file, date)
            .await;
        self.uploading.lock().await.remove(&id);
        result
    }

    async fn store_upload(
        &self,
        client_id: NodeId,
        folder_id: NodeId,
        id: String,
        file: VideoFile,
        date: &str,
    ) -> AppResult<NodeId> {
        let source = match self.binary.put(&id, file.payload.clone()).await {
            Ok(()) => {
                tracing::info!("Video stored: {}", id);
                PlaybackSource::Stored(id.clone())
            }
            Err(e) => {
                tracing::error!("Error storing video {}: {}", id, e);
                PlaybackSource::Detached(file.payload.clone())
            }
        };

        let payload = file.payload.clone();
        let is_portrait = match tokio::task::spawn_blocking(move || probe_dimensions(&payload)).await
        {
            Ok(Some(dimensions)) => dimensions.is_portrait(),
            Ok(None) => {
                tracing::debug!("No dimensions found for {}, assuming landscape", file.name);
                false
            }
            Err(e) => {
                tracing::warn!("Dimension probe failed for {}: {}", file.name, e);
                false
            }
        };

        let mut tree = self.tree.lock().await;
        let (ci, fi) = match folder_position(&tree, client_id, folder_id) {
            Ok(position) => position,
            Err(e) => {
                // Folder was deleted while the payload was being written
                if matches!(source, PlaybackSource::Stored(_)) {
                    if let Err(err) = self.binary.delete(&id).await {
                        tracing::error!("Error deleting video {}: {}", id, err);
                    }
                }
                return Err(e);
            }
        };

        let playback = self.playback.register(source, &file.mime_type).await;
        let video = Video {
            key: Uuid::new_v4(),
            id: Some(id),
            name: file.name,
            size: file.payload.len() as u64,
            date: date.to_string(),
            mime_type: file.mime_type,
            is_portrait,
            playback: Some(playback),
        };
        let key = video.key;

        tree[ci].folders[fi].insert_video(video);
        self.persist(&tree).await;

        Ok(key)
    }

    /// Check that `target` may be deleted and hand back a ticket to confirm.
    pub async fn request_delete(&self, target: DeletionTarget) -> AppResult<PendingDeletion> {
        self.session.require_owner().await?;

        locate(&self.tree.lock().await, &target)?;

        let token = Uuid::new_v4();
        self.pending.lock().await.insert(token, target);

        Ok(PendingDeletion {
            token,
            target,
            prompt: target.prompt().to_string(),
        })
    }

    /// Discard a ticket without deleting anything.
    pub async fn cancel_delete(&self, token: Uuid) -> AppResult<()> {
        self.pending
            .lock()
            .await
            .remove(&token)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Confirmation {} not found", token)))
    }

    /// Run a confirmed deletion: payloads first, then the node, then metadata.
    pub async fn confirm_delete(&self, token: Uuid) -> AppResult<DeletionTarget> {
        self.session.require_owner().await?;

        let target = self
            .pending
            .lock()
            .await
            .remove(&token)
            .ok_or_else(|| AppError::NotFound(format!("Confirmation {} not found", token)))?;

        let mut tree = self.tree.lock().await;
        let location = locate(&tree, &target)?;

        let removed: Vec<Video> = match location {
            Location::Client(ci) => tree[ci]
                .folders
                .iter()
                .flat_map(|f| f.videos.iter().cloned())
                .collect(),
            Location::Folder(ci, fi) => tree[ci].folders[fi].videos.clone(),
            Location::Video(ci, fi, vi) => vec![tree[ci].folders[fi].videos[vi].clone()],
        };

        for video in &removed {
            if let Some(id) = video.id.as_deref().filter(|id| !id.is_empty()) {
                match self.binary.delete(id).await {
                    Ok(()) => tracing::info!("Video deleted: {}", id),
                    Err(e) => tracing::error!("Error deleting video {}: {}", id, e),
                }
            }
            if let Some(playback) = video.playback {
                self.playback.release(playback).await;
            }
        }

        match location {
            Location::Client(ci) => {
                tree.remove(ci);
            }
            Location::Folder(ci, fi) => {
                tree[ci].folders.remove(fi);
            }
            Location::Video(ci, fi, vi) => {
                tree[ci].folders[fi].videos.remove(vi);
            }
        }
        self.persist(&tree).await;

        Ok(target)
    }

    async fn persist(&self, tree: &[Client]) {
        if !self.writable.load(Ordering::SeqCst) {
            tracing::error!("Not saving client tree: the stored one could not be read");
            return;
        }
        if let Err(e) = self.metadata.save_clients(tree).await {
            tracing::error!("Could not save client tree: {}", e);
        }
    }
}

/// Current display positions of a node.
#[derive(Debug, Clone, Copy)]
enum Location {
    Client(usize),
    Folder(usize, usize),
    Video(usize, usize, usize),
}

/// `{client}-{folder}-{millis}`, stepping the timestamp past any id already in
/// the tree or held by an upload in progress.
fn unique_video_id(tree: &[Client], uploading: &HashSet<String>, ci: usize, fi: usize) -> String {
    let taken: HashSet<String> = tree.iter().flat_map(Client::video_ids).collect();
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let id = Video::generate_id(ci, fi, millis);
        if !taken.contains(&id) && !uploading.contains(&id) {
            return id;
        }
        millis += 1;
    }
}

fn client_position(tree: &[Client], client_id: NodeId) -> AppResult<usize> {
    tree.iter()
        .position(|c| c.id == client_id)
        .ok_or_else(|| AppError::NotFound(format!("Client {} not found", client_id)))
}

fn folder_position(
    tree: &[Client],
    client_id: NodeId,
    folder_id: NodeId,
) -> AppResult<(usize, usize)> {
    let ci = client_position(tree, client_id)?;
    let fi = tree[ci]
        .folder_position(folder_id)
        .ok_or_else(|| AppError::NotFound(format!("Folder {} not found", folder_id)))?;
    Ok((ci, fi))
}

fn locate(tree: &[Client], target: &DeletionTarget) -> AppResult<Location> {
    match *target {
        DeletionTarget::Client { client_id } => {
            client_position(tree, client_id).map(Location::Client)
        }
        DeletionTarget::Folder {
            client_id,
            folder_id,
        } => folder_position(tree, client_id, folder_id).map(|(ci, fi)| Location::Folder(ci, fi)),
        DeletionTarget::Video {
            client_id,
            folder_id,
            video_key,
        } => {
            let (ci, fi) = folder_position(tree, client_id, folder_id)?;
            let vi = tree[ci].folders[fi]
                .video_position(video_key)
                .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_key)))?;
            Ok(Location::Video(ci, fi, vi))
        }
    }
}

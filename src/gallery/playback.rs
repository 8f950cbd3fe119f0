//! Process-lifetime registry of playable payloads.

use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::PlaybackRef;

/// Where the bytes behind a playback reference come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackSource {
    /// Read from the binary store under this video id on every request.
    Stored(String),
    /// Upload the binary store refused; only playable until the next load.
    Detached(Bytes),
}

#[derive(Debug, Clone)]
pub struct PlaybackEntry {
    pub source: PlaybackSource,
    pub mime_type: String,
}

/// Length and type of a playable payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub size: u64,
    pub mime_type: String,
}

/// Maps playback tokens to payload sources, much like object URLs in a page.
///
/// Nothing here is persisted; tokens are minted again on every load.
#[derive(Default)]
pub struct PlaybackRegistry {
    entries: RwLock<HashMap<PlaybackRef, PlaybackEntry>>,
}

impl PlaybackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, source: PlaybackSource, mime_type: &str) -> PlaybackRef {
        let playback = PlaybackRef::new();
        self.entries.write().await.insert(
            playback,
            PlaybackEntry {
                source,
                mime_type: mime_type.to_string(),
            },
        );
        playback
    }

    pub async fn get(&self, playback: PlaybackRef) -> Option<PlaybackEntry> {
        self.entries.read().await.get(&playback).cloned()
    }

    pub async fn release(&self, playback: PlaybackRef) {
        self.entries.write().await.remove(&playback);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_get_release() {
        let registry = PlaybackRegistry::new();
        let playback = registry
            .register(PlaybackSource::Stored("0-0-1".to_string()), "video/mp4")
            .await;

        let entry = registry.get(playback).await.unwrap();
        assert_eq!(entry.source, PlaybackSource::Stored("0-0-1".to_string()));
        assert_eq!(entry.mime_type, "video/mp4");

        registry.release(playback).await;
        assert!(registry.get(playback).await.is_none());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let registry = PlaybackRegistry::new();
        let a = registry
            .register(PlaybackSource::Detached(Bytes::new()), "video/mp4")
            .await;
        let b = registry
            .register(PlaybackSource::Detached(Bytes::new()), "video/mp4")
            .await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
    }
}

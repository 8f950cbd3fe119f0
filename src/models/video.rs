//! Video record and its transient playback reference.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::client::new_node_id;
use super::NodeId;

/// Opaque, process-lifetime handle to a loaded payload.
///
/// Regenerated from the binary store on every load; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackRef(pub Uuid);

impl PlaybackRef {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Path the presentation layer serves this payload under.
    pub fn url(&self) -> String {
        format!("/media/{}", self.0)
    }
}

impl Default for PlaybackRef {
    fn default() -> Self {
        Self::new()
    }
}

/// A single uploaded video.
///
/// `id` joins the record to its payload in the binary store. Records saved by
/// early versions carry no id and have no payload, so the session-scoped `key`
/// is what addresses a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(skip, default = "new_node_id")]
    pub key: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub mime_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_portrait: bool,
    #[serde(skip)]
    pub playback: Option<PlaybackRef>,
}

/// Saved records may carry `null` where a value is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Video {
    /// Id format shared with previously saved data.
    pub fn generate_id(client_index: usize, folder_index: usize, millis: i64) -> String {
        format!("{}-{}-{}", client_index, folder_index, millis)
    }

    /// Ordering key: valid dates compare chronologically, anything else sorts
    /// below every valid date.
    pub fn sort_key(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        assert_eq!(Video::generate_id(2, 0, 1700000000123), "2-0-1700000000123");
    }

    #[test]
    fn test_serializes_saved_layout() {
        let video = Video {
            key: Uuid::new_v4(),
            id: Some("0-0-1".to_string()),
            name: "clip.mp4".to_string(),
            size: 42,
            date: "2024-02-01".to_string(),
            mime_type: "video/mp4".to_string(),
            is_portrait: true,
            playback: Some(PlaybackRef::new()),
        };

        let json = serde_json::to_string(&video).unwrap();
        assert_eq!(
            json,
            r#"{"id":"0-0-1","name":"clip.mp4","size":42,"date":"2024-02-01","type":"video/mp4","isPortrait":true}"#
        );
    }

    #[test]
    fn test_reads_legacy_record_with_blob_url() {
        let json = r#"{"name":"old.mov","size":7,"date":"2023-01-01","blobUrl":"blob:x","type":"video/quicktime"}"#;
        let video: Video = serde_json::from_str(json).unwrap();

        assert!(video.id.is_none());
        assert!(!video.is_portrait);
        assert!(video.playback.is_none());
        assert_eq!(video.mime_type, "video/quicktime");
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let json = r#"{"id":"0-0-1","name":"clip.mp4","size":null,"date":null,"type":null,"isPortrait":null}"#;
        let video: Video = serde_json::from_str(json).unwrap();

        assert_eq!(video.id.as_deref(), Some("0-0-1"));
        assert_eq!(video.size, 0);
        assert_eq!(video.date, "");
        assert_eq!(video.mime_type, "");
        assert!(!video.is_portrait);
    }
}

//! SQLite-backed metadata store.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use super::{open_pool, MetadataStore};
use crate::errors::{AppError, AppResult};

/// String entries in a `kv (key, value)` table.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Open the database and create the entry table if needed.
    pub async fn open(db_path: &Path) -> AppResult<Self> {
        let pool = open_pool(db_path).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| AppError::StoreUnavailable(format!("Cannot create kv table: {}", e)))?;

        tracing::info!("Metadata store opened at {:?}", db_path);
        Ok(Self { pool })
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CLIENTS_BACKUP_KEY, CLIENTS_KEY, IS_OWNER_KEY};
    use crate::models::{Client, Video};
    use tempfile::TempDir;

    fn sample_tree() -> Vec<Client> {
        let mut client = Client::new("Acme");
        client.folders[0].insert_video(Video {
            key: uuid::Uuid::new_v4(),
            id: Some("0-0-1700000000000".to_string()),
            name: "launch.mp4".to_string(),
            size: 2048,
            date: "2024-03-01".to_string(),
            mime_type: "video/mp4".to_string(),
            is_portrait: true,
            playback: Some(crate::models::PlaybackRef::new()),
        });
        vec![client, Client::new("Globex")]
    }

    #[tokio::test]
    async fn test_first_run_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = SqliteMetadataStore::open(&dir.path().join("meta.sqlite"))
            .await
            .unwrap();

        assert!(store.load_clients().await.unwrap().is_empty());
        assert!(!store.session_flag().await.unwrap());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.sqlite");
        let tree = sample_tree();

        SqliteMetadataStore::open(&path)
            .await
            .unwrap()
            .save_clients(&tree)
            .await
            .unwrap();

        let loaded = SqliteMetadataStore::open(&path)
            .await
            .unwrap()
            .load_clients()
            .await
            .unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "Acme");
        assert_eq!(loaded[0].folders[0].name, "Acme Videos");
        let video = &loaded[0].folders[0].videos[0];
        assert_eq!(video.id.as_deref(), Some("0-0-1700000000000"));
        assert_eq!(video.size, 2048);
        assert!(video.is_portrait);
        assert!(video.playback.is_none());
        assert_eq!(loaded[1].folders[0].name, "Globex Videos");
    }

    #[tokio::test]
    async fn test_saved_layout_matches_existing_data() {
        let dir = TempDir::new().unwrap();
        let store = SqliteMetadataStore::open(&dir.path().join("meta.sqlite"))
            .await
            .unwrap();

        store.save_clients(&sample_tree()).await.unwrap();

        let raw = store.get_item(CLIENTS_KEY).await.unwrap().unwrap();
        assert_eq!(
            raw,
            concat!(
                r#"[{"name":"Acme","folders":[{"name":"Acme Videos","videos":["#,
                r#"{"id":"0-0-1700000000000","name":"launch.mp4","size":2048,"date":"2024-03-01","type":"video/mp4","isPortrait":true}]}]},"#,
                r#"{"name":"Globex","folders":[{"name":"Globex Videos","videos":[]}]}]"#
            )
        );
    }

    #[tokio::test]
    async fn test_session_flag_set_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = SqliteMetadataStore::open(&dir.path().join("meta.sqlite"))
            .await
            .unwrap();

        store.set_session_flag(true).await.unwrap();
        assert_eq!(
            store.get_item(IS_OWNER_KEY).await.unwrap().as_deref(),
            Some("true")
        );
        assert!(store.session_flag().await.unwrap());

        store.set_session_flag(false).await.unwrap();
        assert_eq!(store.get_item(IS_OWNER_KEY).await.unwrap(), None);
        assert!(!store.session_flag().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_tree_loads_empty_and_is_kept() {
        let dir = TempDir::new().unwrap();
        let store = SqliteMetadataStore::open(&dir.path().join("meta.sqlite"))
            .await
            .unwrap();

        store.set_item(CLIENTS_KEY, "{not json").await.unwrap();
        assert!(store.load_clients().await.unwrap().is_empty());
        assert_eq!(
            store.get_item(CLIENTS_BACKUP_KEY).await.unwrap().as_deref(),
            Some("{not json")
        );

        store.remove_item(CLIENTS_BACKUP_KEY).await.unwrap();
        store.set_item(CLIENTS_KEY, "null").await.unwrap();
        assert!(store.load_clients().await.unwrap().is_empty());
        assert_eq!(store.get_item(CLIENTS_BACKUP_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_null_video_fields_still_load() {
        let dir = TempDir::new().unwrap();
        let store = SqliteMetadataStore::open(&dir.path().join("meta.sqlite"))
            .await
            .unwrap();

        store
            .set_item(
                CLIENTS_KEY,
                r#"[{"name":"Acme","folders":[{"name":"Acme Videos","videos":[{"id":"0-0-1","name":"a.mp4","size":null,"date":"2024-01-01","type":"video/mp4","isPortrait":null}]}]}]"#,
            )
            .await
            .unwrap();

        let loaded = store.load_clients().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].folders[0].videos[0].size, 0);
        assert_eq!(store.get_item(CLIENTS_BACKUP_KEY).await.unwrap(), None);
    }
}

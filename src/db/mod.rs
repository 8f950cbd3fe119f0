//! Persistence layer.
//!
//! Two independent stores back the gallery: a binary store holding video
//! payloads keyed by video id, and a metadata store holding string entries
//! (the serialized client tree and the session flag). Both are SQLite files by
//! default; in-memory backends exist for tests and degraded startup.

mod binary;
mod memory;
mod metadata;

pub use binary::*;
pub use memory::*;
pub use metadata::*;

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};
use crate::models::Client;

/// Metadata key holding the JSON client tree.
pub const CLIENTS_KEY: &str = "clients";
/// Metadata key keeping a copy of a client tree that could not be parsed.
pub const CLIENTS_BACKUP_KEY: &str = "clients.unreadable";
/// Metadata key holding the owner flag (`"true"` or absent).
pub const IS_OWNER_KEY: &str = "isOwner";

/// Durable key to blob storage for video payloads.
///
/// `get` and `delete` treat an unknown id as a normal outcome.
#[async_trait]
pub trait BinaryStore: Send + Sync {
    /// Establish the store, creating its schema if absent. Safe to call
    /// repeatedly and concurrently.
    async fn open(&self) -> AppResult<()>;

    /// Insert or replace the payload stored under `id`.
    async fn put(&self, id: &str, payload: Bytes) -> AppResult<()>;

    /// Fetch a payload, `Ok(None)` if the id is unknown.
    async fn get(&self, id: &str) -> AppResult<Option<Bytes>>;

    /// Length of a payload in bytes without reading it.
    async fn size(&self, id: &str) -> AppResult<Option<u64>>;

    /// Bytes `range` of a payload, clipped to its length.
    async fn get_range(&self, id: &str, range: Range<u64>) -> AppResult<Option<Bytes>>;

    /// Remove a payload if present.
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Durable key to string storage.
///
/// Backends implement the raw entry operations; the typed accessors for the
/// client tree and the session flag are shared.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_item(&self, key: &str) -> AppResult<Option<String>>;

    /// Replace the entry in a single write.
    async fn set_item(&self, key: &str, value: &str) -> AppResult<()>;

    async fn remove_item(&self, key: &str) -> AppResult<()>;

    /// Last saved client tree, empty on first run or unreadable content.
    ///
    /// Unreadable content is copied to [`CLIENTS_BACKUP_KEY`] before an empty
    /// tree is returned. If that copy cannot be written the error is returned
    /// instead, since the next save would destroy the only copy.
    async fn load_clients(&self) -> AppResult<Vec<Client>> {
        let Some(raw) = self.get_item(CLIENTS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Option<Vec<Client>>>(&raw) {
            Ok(clients) => Ok(clients.unwrap_or_default()),
            Err(e) => {
                self.set_item(CLIENTS_BACKUP_KEY, &raw).await?;
                tracing::warn!(
                    "Stored client tree is unreadable, kept as {:?} and starting empty: {}",
                    CLIENTS_BACKUP_KEY,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Serialize and write the whole tree.
    async fn save_clients(&self, clients: &[Client]) -> AppResult<()> {
        let raw = serde_json::to_string(clients)?;
        self.set_item(CLIENTS_KEY, &raw).await
    }

    async fn session_flag(&self) -> AppResult<bool> {
        Ok(self.get_item(IS_OWNER_KEY).await?.as_deref() == Some("true"))
    }

    /// Persist `"true"` for owner mode, clear the entry otherwise.
    async fn set_session_flag(&self, is_owner: bool) -> AppResult<()> {
        if is_owner {
            self.set_item(IS_OWNER_KEY, "true").await
        } else {
            self.remove_item(IS_OWNER_KEY).await
        }
    }
}

/// Open a SQLite connection pool, creating the file and its parent directory.
///
/// Any failure is reported as [`AppError::StoreUnavailable`].
pub async fn open_pool(db_path: &Path) -> AppResult<SqlitePool> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::StoreUnavailable(format!(
                "Cannot create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)
        .map_err(unavailable)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(unavailable)
}

fn unavailable(err: sqlx::Error) -> AppError {
    tracing::error!("Store unavailable: {:?}", err);
    AppError::StoreUnavailable(format!("Store unavailable: {}", err))
}

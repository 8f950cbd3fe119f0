//! SQLite-backed binary store.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use sqlx::{Row, SqlitePool};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{open_pool, BinaryStore};
use crate::errors::{AppError, AppResult};

type OpenAttempt = Shared<BoxFuture<'static, AppResult<SqlitePool>>>;

/// Video payloads in a single `videos (id, file)` table.
///
/// The pool is opened lazily; every operation goes through [`BinaryStore::open`]
/// first so a store that was unavailable at startup is retried later.
pub struct SqliteBinaryStore {
    path: PathBuf,
    attempt: Mutex<Option<OpenAttempt>>,
}

impl SqliteBinaryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            attempt: Mutex::new(None),
        }
    }

    /// Join the in-flight open attempt or start one. Every caller of the same
    /// attempt sees the same outcome; a failed attempt is dropped so the next
    /// call starts fresh.
    async fn pool(&self) -> AppResult<SqlitePool> {
        let attempt = {
            let mut slot = self.attempt.lock().await;
            match slot.as_ref() {
                Some(attempt) => attempt.clone(),
                None => {
                    let attempt = open_store(self.path.clone()).boxed().shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.clone().await;

        if result.is_err() {
            let mut slot = self.attempt.lock().await;
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&attempt)) {
                *slot = None;
            }
        }

        result
    }
}

async fn open_store(path: PathBuf) -> AppResult<SqlitePool> {
    let pool = open_pool(&path).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            file BLOB NOT NULL
        );
        "#,
    )
    .execute(&pool)
    .await
    .map_err(|e| AppError::StoreUnavailable(format!("Cannot create video table: {}", e)))?;

    tracing::info!("Video store opened at {:?}", path);
    Ok(pool)
}

#[async_trait]
impl BinaryStore for SqliteBinaryStore {
    async fn open(&self) -> AppResult<()> {
        self.pool().await.map(|_| ())
    }

    async fn put(&self, id: &str, payload: Bytes) -> AppResult<()> {
        let pool = self.pool().await?;

        sqlx::query(
            "INSERT INTO videos (id, file) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET file = excluded.file",
        )
        .bind(id)
        .bind(payload.as_ref())
        .execute(&pool)
        .await?;

        tracing::debug!("Video stored: {} ({} bytes)", id, payload.len());
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<Bytes>> {
        let pool = self.pool().await?;

        let row = sqlx::query("SELECT file FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

        Ok(row.map(|row| Bytes::from(row.get::<Vec<u8>, _>("file"))))
    }

    async fn size(&self, id: &str) -> AppResult<Option<u64>> {
        let pool = self.pool().await?;

        let row = sqlx::query("SELECT length(file) AS size FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

        Ok(row.map(|row| row.get::<i64, _>("size").max(0) as u64))
    }

    async fn get_range(&self, id: &str, range: Range<u64>) -> AppResult<Option<Bytes>> {
        let pool = self.pool().await?;

        // substr() counts from 1
        let start = range.start.min(i64::MAX as u64 - 1) as i64 + 1;
        let len = range.end.saturating_sub(range.start).min(i64::MAX as u64) as i64;

        let row = sqlx::query("SELECT substr(file, ?, ?) AS part FROM videos WHERE id = ?")
            .bind(start)
            .bind(len)
            .bind(id)
            .fetch_optional(&pool)
            .await?;

        Ok(row.map(|row| Bytes::from(row.get::<Vec<u8>, _>("part"))))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let pool = self.pool().await?;

        sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await?;

        tracing::debug!("Video deleted: {}", id);
        Ok(())
    }
}

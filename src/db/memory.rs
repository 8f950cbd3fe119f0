//! In-memory store backends.
//!
//! The metadata store doubles as the fallback when the database cannot be
//! opened at startup; the binary store only backs tests. Contents are lost
//! when the process exits.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::MetadataStore;
use crate::errors::AppResult;

#[cfg(test)]
pub use binary::MemoryBinaryStore;

/// `HashMap`-based metadata store.
pub struct MemoryMetadataStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Copy of every entry, for comparing store state before and after.
    #[cfg(test)]
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.items.read().await.clone()
    }
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod binary {
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::ops::Range;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    use crate::db::BinaryStore;
    use crate::errors::{AppError, AppResult};

    /// `HashMap`-based binary store.
    ///
    /// Can be switched to unavailable to behave like a platform that denies
    /// storage access.
    pub struct MemoryBinaryStore {
        payloads: RwLock<HashMap<String, Bytes>>,
        deleted: RwLock<Vec<String>>,
        available: AtomicBool,
    }

    impl MemoryBinaryStore {
        pub fn new() -> Self {
            Self {
                payloads: RwLock::new(HashMap::new()),
                deleted: RwLock::new(Vec::new()),
                available: AtomicBool::new(true),
            }
        }

        /// Store that refuses every operation.
        pub fn unavailable() -> Self {
            let store = Self::new();
            store.set_available(false);
            store
        }

        pub fn set_available(&self, available: bool) {
            self.available.store(available, Ordering::SeqCst);
        }

        /// Number of payloads currently stored.
        pub async fn len(&self) -> usize {
            self.payloads.read().await.len()
        }

        pub async fn contains(&self, id: &str) -> bool {
            self.payloads.read().await.contains_key(id)
        }

        /// Ids passed to `delete`, in call order.
        pub async fn deleted_ids(&self) -> Vec<String> {
            self.deleted.read().await.clone()
        }

        fn check(&self) -> AppResult<()> {
            if self.available.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(AppError::StoreUnavailable(
                    "Binary storage access denied".to_string(),
                ))
            }
        }
    }

    impl Default for MemoryBinaryStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl BinaryStore for MemoryBinaryStore {
        async fn open(&self) -> AppResult<()> {
            self.check()
        }

        async fn put(&self, id: &str, payload: Bytes) -> AppResult<()> {
            self.check()?;
            self.payloads.write().await.insert(id.to_string(), payload);
            Ok(())
        }

        async fn get(&self, id: &str) -> AppResult<Option<Bytes>> {
            self.check()?;
            Ok(self.payloads.read().await.get(id).cloned())
        }

        async fn size(&self, id: &str) -> AppResult<Option<u64>> {
            self.check()?;
            Ok(self.payloads.read().await.get(id).map(|p| p.len() as u64))
        }

        async fn get_range(&self, id: &str, range: Range<u64>) -> AppResult<Option<Bytes>> {
            self.check()?;
            Ok(self.payloads.read().await.get(id).map(|payload| {
                let len = payload.len() as u64;
                let end = range.end.min(len);
                payload.slice(range.start.min(end) as usize..end as usize)
            }))
        }

        async fn delete(&self, id: &str) -> AppResult<()> {
            self.check()?;
            self.deleted.write().await.push(id.to_string());
            self.payloads.write().await.remove(id);
            Ok(())
        }
    }
}

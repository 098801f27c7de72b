//! Typed JSON access over a [`KvStore`].

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::Result;
use crate::file::FileStore;
use crate::kv::{KvStore, MemoryStore};

/// Shared handle used by all repositories.
#[derive(Clone)]
pub struct Store {
    kv: Arc<dyn KvStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Store {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv, write_lock: Arc::new(Mutex::new(())) }
    }

    /// File-backed store rooted at `dir`.
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::new(Arc::new(FileStore::open(dir).await?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Serialises read-modify-write cycles on shared documents.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// `Ok(None)` when the key is absent; an error when the document does not parse.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.kv.put(key, &text).await
    }

    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.kv.remove(key).await
    }

    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.kv.keys_with_prefix(prefix).await
    }
}

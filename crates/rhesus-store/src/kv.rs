//! Raw key/value storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// A flat namespace of string keys holding serialized documents.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Returns whether the key existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Volatile store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

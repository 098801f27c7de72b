//! Whole-store export, import, and reset.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::keys::{CHAT_HISTORY_PREFIX, PIPELINES, PROJECTS, RECENT_CHATS};
use crate::kv::KvStore;
use crate::store::Store;

#[derive(Clone)]
pub struct BackupRepository {
    store: Store,
}

impl BackupRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Projects, pipelines, recent chats and every chat history as one JSON object.
    /// Snapshots are not included.
    pub async fn export(&self) -> Result<Map<String, Value>> {
        let mut keys: Vec<String> = [PROJECTS, PIPELINES, RECENT_CHATS]
            .iter()
            .map(|k| k.to_string())
            .collect();
        keys.extend(self.store.keys_with_prefix(CHAT_HISTORY_PREFIX).await?);

        let mut out = Map::new();
        for key in keys {
            let Some(text) = self.store.kv().get(&key).await? else { continue };
            let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
            out.insert(key, value);
        }
        Ok(out)
    }

    /// Overwrite every key present in `data`. Keys outside the exported set are rejected.
    pub async fn import(&self, data: &Map<String, Value>) -> Result<usize> {
        if let Some(bad) = data.keys().find(|k| !is_backup_key(k)) {
            return Err(StoreError::InvalidInput(format!("Unexpected key in backup: {}", bad)));
        }
        let _guard = self.store.lock().await;
        for (key, value) in data {
            self.store.put_json(key, value).await?;
        }
        info!(keys = data.len(), "Backup imported");
        Ok(data.len())
    }

    /// Remove everything, snapshots included.
    pub async fn reset(&self) -> Result<usize> {
        let _guard = self.store.lock().await;
        let keys = self.store.keys_with_prefix("").await?;
        for key in &keys {
            self.store.remove(key).await?;
        }
        warn!(keys = keys.len(), "Store reset");
        Ok(keys.len())
    }
}

fn is_backup_key(key: &str) -> bool {
    matches!(key, PROJECTS | PIPELINES | RECENT_CHATS)
        || key.strip_prefix(CHAT_HISTORY_PREFIX).is_some_and(|rest| !rest.is_empty())
}

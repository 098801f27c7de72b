//! Per-conversation chat history.

use rhesus_common::ChatMessage;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::keys::{HistoryKey, CHAT_HISTORY_PREFIX};
use crate::store::Store;

#[derive(Clone)]
pub struct HistoryRepository {
    store: Store,
}

impl HistoryRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// `None` when nothing is stored. A document that no longer parses is
    /// deleted and reported as absent.
    pub async fn load(&self, key: &HistoryKey) -> Result<Option<Vec<ChatMessage>>> {
        let storage_key = key.storage_key();
        match self.store.get_json::<Vec<ChatMessage>>(&storage_key).await {
            Ok(messages) => Ok(messages),
            Err(StoreError::Serialization(e)) => {
                warn!(key = %storage_key, error = %e, "Failed to parse chat history; discarding it");
                self.store.remove(&storage_key).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, key: &HistoryKey, messages: &[ChatMessage]) -> Result<()> {
        debug!(key = %key, messages = messages.len(), "Saving chat history");
        self.store.put_json(&key.storage_key(), messages).await
    }

    pub async fn clear(&self, key: &HistoryKey) -> Result<bool> {
        self.store.remove(&key.storage_key()).await
    }

    /// Every conversation that has a stored history.
    pub async fn keys(&self) -> Result<Vec<HistoryKey>> {
        Ok(self
            .store
            .keys_with_prefix(CHAT_HISTORY_PREFIX)
            .await?
            .iter()
            .filter_map(|k| HistoryKey::from_storage_key(k))
            .collect())
    }
}

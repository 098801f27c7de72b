//! Most-recently-used conversations, newest first.

use rhesus_common::RecentChat;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::keys::RECENT_CHATS;
use crate::store::Store;

#[derive(Clone)]
pub struct RecentChatRepository {
    store: Store,
}

impl RecentChatRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<RecentChat>> {
        match self.store.get_json::<Vec<RecentChat>>(RECENT_CHATS).await {
            Ok(chats) => Ok(chats.unwrap_or_default()),
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Failed to parse recent chats; starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Put `chat` at the front, dropping any older entry with the same id.
    pub async fn push(&self, chat: RecentChat) -> Result<Vec<RecentChat>> {
        let _guard = self.store.lock().await;
        let mut chats = self.list().await?;
        chats.retain(|c| c.id != chat.id);
        chats.insert(0, chat);
        self.store.put_json(RECENT_CHATS, &chats).await?;
        Ok(chats)
    }

    pub async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.store.lock().await;
        let mut chats = self.list().await?;
        let before = chats.len();
        chats.retain(|c| c.id != id);
        if chats.len() == before {
            return Ok(false);
        }
        self.store.put_json(RECENT_CHATS, &chats).await?;
        Ok(true)
    }
}

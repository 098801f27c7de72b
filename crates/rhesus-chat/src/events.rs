//! Change notifications for connected clients.

use rhesus_common::{ApiStatus, ChatMessage, RecentChat};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    MessageAppended { conversation: String, message: ChatMessage },
    /// A message's content was rewritten (job progress, UniProt lookup).
    MessageUpdated { conversation: String, message: ChatMessage },
    ConversationReset { conversation: String },
    ApiStatusChanged { status: ApiStatus },
    RecentChatsChanged { chats: Vec<RecentChat> },
}

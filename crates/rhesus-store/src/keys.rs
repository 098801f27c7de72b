//! Storage keys shared with the browser client.

use serde::{Deserialize, Serialize};

pub const PROJECTS: &str = "projects";
pub const PIPELINES: &str = "pipelines";
pub const RECENT_CHATS: &str = "recentChats";
pub const CHAT_HISTORY_PREFIX: &str = "chatHistory_";
pub const SNAPSHOT_PREFIX: &str = "snapshot_";

pub fn snapshot_key(id: &str) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, id)
}

/// Which conversation a chat history belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HistoryKey {
    General,
    Project(String),
}

impl HistoryKey {
    pub const GENERAL_ID: &'static str = "general";

    pub fn id(&self) -> &str {
        match self {
            Self::General => Self::GENERAL_ID,
            Self::Project(id) => id,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::General => None,
            Self::Project(id) => Some(id),
        }
    }

    pub fn storage_key(&self) -> String {
        format!("{}{}", CHAT_HISTORY_PREFIX, self.id())
    }

    pub fn from_storage_key(key: &str) -> Option<Self> {
        key.strip_prefix(CHAT_HISTORY_PREFIX).map(Self::from)
    }
}

impl From<&str> for HistoryKey {
    fn from(id: &str) -> Self {
        if id == Self::GENERAL_ID || id.is_empty() {
            Self::General
        } else {
            Self::Project(id.to_string())
        }
    }
}

impl From<String> for HistoryKey {
    fn from(id: String) -> Self {
        Self::from(id.as_str())
    }
}

impl From<HistoryKey> for String {
    fn from(key: HistoryKey) -> Self {
        match key {
            HistoryKey::General => HistoryKey::GENERAL_ID.to_string(),
            HistoryKey::Project(id) => id,
        }
    }
}

impl std::fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keys() {
        assert_eq!(HistoryKey::General.storage_key(), "chatHistory_general");
        assert_eq!(HistoryKey::from("proj-42").storage_key(), "chatHistory_proj-42");
        assert_eq!(HistoryKey::from_storage_key("chatHistory_general"), Some(HistoryKey::General));
        assert_eq!(HistoryKey::from_storage_key("projects"), None);
        assert_eq!(snapshot_key("snap-1"), "snapshot_snap-1");
    }
}

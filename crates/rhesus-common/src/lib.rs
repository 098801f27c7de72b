//! rhesus-common: Shared types, errors, and the sandboxed HTTP client used across all Rhesus crates.

pub mod error;
pub mod entities;
pub mod sandbox;

// Re-export commonly used types
pub use error::{Result, RhesusError};
pub use entities::{
    Action, AiResponse, ApiStatus, BlastHit, ChatMessage, ContentBlock, ContentType,
    MessageAuthor, Pipeline, PipelineStep, Project, RecentChat, RecentChatKind, ReplyTo,
    Snapshot, ToolCall, UniProtEntry, new_id,
};

//! rhesus-chat: conversation orchestration for Dr. Rhesus.
//!
//! A conversation is either the general chat or the chat attached to a
//! project. [`ChatService`] owns every open conversation: it turns user input
//! into prompts, talks to the model, executes the bioinformatics tool calls
//! the model asks for, keeps long-running EBI jobs polled in the background,
//! and persists the history after every change.

pub mod commands;
pub mod conversation;
pub mod events;
pub mod service;

pub use commands::{Attachment, Prompt};
pub use events::ChatEvent;
pub use rhesus_store::HistoryKey;
pub use service::{ChatConfig, ChatService, SendRequest};

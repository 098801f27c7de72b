//! Rhesus persistence layer.
//!
//! Everything the assistant remembers is a JSON document under a string key,
//! using the same keys and document shapes as the browser client:
//!
//! | key                        | document            |
//! |----------------------------|---------------------|
//! | `projects`                 | `Vec<Project>`      |
//! | `pipelines`                | `Vec<Pipeline>`     |
//! | `recentChats`              | `Vec<RecentChat>`   |
//! | `chatHistory_general`      | `Vec<ChatMessage>`  |
//! | `chatHistory_<projectId>`  | `Vec<ChatMessage>`  |
//! | `snapshot_<id>`            | `Snapshot`          |
//!
//! # Example
//!
//! ```rust,no_run
//! use rhesus_store::{ProjectRepository, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open("./data/store").await?;
//!     let projects = ProjectRepository::new(store);
//!     projects.create("Insulin variants", "").await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod kv;
pub mod file;
pub mod keys;
pub mod store;
pub mod projects;
pub mod pipelines;
pub mod history;
pub mod recent;
pub mod snapshots;
pub mod backup;

pub use error::{Result, StoreError};
pub use kv::{KvStore, MemoryStore};
pub use file::FileStore;
pub use keys::HistoryKey;
pub use store::Store;
pub use projects::{ProjectRepository, ProjectUpdate};
pub use pipelines::PipelineRepository;
pub use history::HistoryRepository;
pub use recent::RecentChatRepository;
pub use snapshots::SnapshotRepository;
pub use backup::BackupRepository;

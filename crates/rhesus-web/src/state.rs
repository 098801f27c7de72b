//! Shared application state for the web server.

use std::path::PathBuf;
use std::sync::Arc;

use rhesus_bioapi::{JobService, SequenceLookup, StructureFetcher};
use rhesus_chat::{ChatEvent, ChatService};
use rhesus_store::{
    BackupRepository, PipelineRepository, ProjectRepository, RecentChatRepository, SnapshotRepository, Store,
};
use tokio::sync::broadcast;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub chat: ChatService,
    pub jobs: Arc<dyn JobService>,
    pub lookup: Arc<dyn SequenceLookup>,
    pub structures: Arc<StructureFetcher>,
    pub projects: ProjectRepository,
    pub pipelines: PipelineRepository,
    pub recent: RecentChatRepository,
    pub snapshots: SnapshotRepository,
    pub backup: BackupRepository,
    /// Directory of a built web client to serve at `/`, if any.
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        chat: ChatService,
        jobs: Arc<dyn JobService>,
        lookup: Arc<dyn SequenceLookup>,
        structures: Arc<StructureFetcher>,
        store: Store,
    ) -> Self {
        Self {
            chat,
            jobs,
            lookup,
            structures,
            projects: ProjectRepository::new(store.clone()),
            pipelines: PipelineRepository::new(store.clone()),
            recent: RecentChatRepository::new(store.clone()),
            snapshots: SnapshotRepository::new(store.clone()),
            backup: BackupRepository::new(store),
            static_dir: None,
        }
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.chat.subscribe()
    }
}

pub type SharedState = Arc<AppState>;

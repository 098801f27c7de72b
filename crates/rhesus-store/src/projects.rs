//! Project repository.
//!
//! Projects live in a single `projects` document, in creation order.

use chrono::Utc;
use rhesus_common::{new_id, ContentBlock, Project};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::keys::{HistoryKey, PROJECTS};
use crate::recent::RecentChatRepository;
use crate::store::Store;

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct ProjectRepository {
    store: Store,
}

impl ProjectRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Project>> {
        match self.store.get_json::<Vec<Project>>(PROJECTS).await {
            Ok(projects) => Ok(projects.unwrap_or_default()),
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Failed to parse projects; starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    pub async fn require(&self, id: &str) -> Result<Project> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Project not found: {}", id)))
    }

    pub async fn create(&self, title: &str, description: &str) -> Result<Project> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidInput("Project title is required.".to_string()));
        }
        let project = Project::new(title, description.trim());

        let _guard = self.store.lock().await;
        let mut projects = self.list().await?;
        projects.push(project.clone());
        self.store.put_json(PROJECTS, &projects).await?;
        info!(project_id = %project.id, title = %project.title, "Project created");
        Ok(project)
    }

    pub async fn update(&self, id: &str, update: ProjectUpdate) -> Result<Project> {
        let _guard = self.store.lock().await;
        self.modify(id, |project| {
            if let Some(title) = update.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                project.title = title.to_string();
            }
            if let Some(description) = update.description {
                project.description = description.trim().to_string();
            }
        })
        .await
    }

    /// Deletes the project together with its chat history and recent-chat entry.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        {
            let _guard = self.store.lock().await;
            let mut projects = self.list().await?;
            let before = projects.len();
            projects.retain(|p| p.id != id);
            if projects.len() == before {
                return Ok(false);
            }
            self.store.put_json(PROJECTS, &projects).await?;
            self.store.remove(&HistoryKey::Project(id.to_string()).storage_key()).await?;
        }
        RecentChatRepository::new(self.store.clone()).remove(id).await?;
        info!(project_id = %id, "Project deleted");
        Ok(true)
    }

    /// Append a copy of `block` under a fresh id and return the stored copy.
    pub async fn add_block(&self, id: &str, block: &ContentBlock) -> Result<ContentBlock> {
        let stored = ContentBlock { id: new_id("cb"), ..block.clone() };
        let _guard = self.store.lock().await;
        let added = stored.clone();
        self.modify(id, move |project| project.content_blocks.push(added)).await?;
        Ok(stored)
    }

    pub async fn remove_block(&self, id: &str, block_id: &str) -> Result<bool> {
        let _guard = self.store.lock().await;
        let project = self.require(id).await?;
        if !project.content_blocks.iter().any(|b| b.id == block_id) {
            return Ok(false);
        }
        self.modify(id, |project| project.content_blocks.retain(|b| b.id != block_id)).await?;
        Ok(true)
    }

    /// Apply `f` to one project and bump its modification time.
    /// Callers hold the store lock.
    async fn modify<F>(&self, id: &str, f: F) -> Result<Project>
    where
        F: FnOnce(&mut Project) + Send,
    {
        let mut projects = self.list().await?;
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Project not found: {}", id)))?;
        f(project);
        project.last_modified = Utc::now();
        let updated = project.clone();
        self.store.put_json(PROJECTS, &projects).await?;
        Ok(updated)
    }
}

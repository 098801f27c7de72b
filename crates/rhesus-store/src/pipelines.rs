//! Pipeline repository.

use rhesus_common::Pipeline;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::keys::PIPELINES;
use crate::store::Store;

/// Seeded when nothing has been saved yet.
pub fn default_pipelines() -> Vec<Pipeline> {
    let mut example = Pipeline::new(
        "Full Protein Analysis",
        "Finds structure, runs BLAST, and searches literature.",
        &[
            "find best structure for {protein_name}",
            "run blast on {protein_name}",
            "summarize literature about {protein_name}",
        ],
    );
    example.id = "pipe-example-1".to_string();
    for (i, step) in example.steps.iter_mut().enumerate() {
        step.id = format!("step-{}", i + 1);
    }
    vec![example]
}

#[derive(Clone)]
pub struct PipelineRepository {
    store: Store,
}

impl PipelineRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Pipeline>> {
        match self.store.get_json::<Vec<Pipeline>>(PIPELINES).await {
            Ok(Some(pipelines)) => Ok(pipelines),
            Ok(None) => Ok(default_pipelines()),
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Failed to parse pipelines; using defaults");
                Ok(default_pipelines())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Pipeline>> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    pub async fn require(&self, id: &str) -> Result<Pipeline> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Pipeline not found: {}", id)))
    }

    pub async fn create(&self, name: &str, description: &str, prompts: &[&str]) -> Result<Pipeline> {
        let pipeline = Pipeline::new(name.trim(), description.trim(), prompts);
        self.save(pipeline).await
    }

    /// Insert or replace by id.
    pub async fn save(&self, pipeline: Pipeline) -> Result<Pipeline> {
        validate(&pipeline)?;
        let _guard = self.store.lock().await;
        let mut pipelines = self.list().await?;
        match pipelines.iter_mut().find(|p| p.id == pipeline.id) {
            Some(existing) => *existing = pipeline.clone(),
            None => pipelines.push(pipeline.clone()),
        }
        self.store.put_json(PIPELINES, &pipelines).await?;
        info!(pipeline_id = %pipeline.id, steps = pipeline.steps.len(), "Pipeline saved");
        Ok(pipeline)
    }

    /// Replace an existing pipeline; unknown ids are an error.
    pub async fn update(&self, pipeline: Pipeline) -> Result<Pipeline> {
        validate(&pipeline)?;
        // Check and write under one lock so a concurrent delete cannot be undone.
        let _guard = self.store.lock().await;
        let mut pipelines = self.list().await?;
        let existing = pipelines
            .iter_mut()
            .find(|p| p.id == pipeline.id)
            .ok_or_else(|| StoreError::NotFound(format!("Pipeline not found: {}", pipeline.id)))?;
        *existing = pipeline.clone();
        self.store.put_json(PIPELINES, &pipelines).await?;
        info!(pipeline_id = %pipeline.id, steps = pipeline.steps.len(), "Pipeline updated");
        Ok(pipeline)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.store.lock().await;
        let mut pipelines = self.list().await?;
        let before = pipelines.len();
        pipelines.retain(|p| p.id != id);
        if pipelines.len() == before {
            return Ok(false);
        }
        self.store.put_json(PIPELINES, &pipelines).await?;
        Ok(true)
    }
}

fn validate(pipeline: &Pipeline) -> Result<()> {
    if pipeline.name.trim().is_empty() {
        return Err(StoreError::InvalidInput("Pipeline name is required.".to_string()));
    }
    if pipeline.steps.iter().all(|s| s.prompt.trim().is_empty()) {
        return Err(StoreError::InvalidInput("A pipeline needs at least one step.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_until_first_save() {
        let repo = PipelineRepository::new(Store::in_memory());
        let pipelines = repo.list().await.unwrap();
        assert_eq!(pipelines.len(), 1);
        assert_eq!(pipelines[0].id, "pipe-example-1");
        assert_eq!(pipelines[0].steps[1].prompt, "run blast on {protein_name}");

        let created = repo.create("Quick look", "", &["show {protein_name}"]).await.unwrap();
        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["pipe-example-1".to_string(), created.id]);
    }

    #[tokio::test]
    async fn test_update_never_resurrects_a_deleted_pipeline() {
        let repo = PipelineRepository::new(Store::in_memory());
        let keep = repo.create("Keep", "", &["show {protein_name}"]).await.unwrap();
        let mut doomed = repo.require("pipe-example-1").await.unwrap();
        doomed.name = "Edited".into();

        let (updated, deleted) = tokio::join!(repo.update(doomed.clone()), repo.delete("pipe-example-1"));
        assert!(deleted.unwrap());
        assert!(updated.is_ok() || matches!(updated, Err(StoreError::NotFound(_))));
        assert!(repo.get("pipe-example-1").await.unwrap().is_none());

        assert!(matches!(repo.update(doomed).await, Err(StoreError::NotFound(_))));
        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![keep.id]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = PipelineRepository::new(Store::in_memory());
        let mut pipeline = repo.require("pipe-example-1").await.unwrap();
        pipeline.name = "Renamed".into();
        repo.update(pipeline).await.unwrap();
        assert_eq!(repo.require("pipe-example-1").await.unwrap().name, "Renamed");

        let ghost = Pipeline::new("Ghost", "", &["x"]);
        assert!(matches!(repo.update(ghost).await, Err(StoreError::NotFound(_))));

        assert!(repo.delete("pipe-example-1").await.unwrap());
        // An explicitly emptied list stays empty.
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation() {
        let repo = PipelineRepository::new(Store::in_memory());
        assert!(repo.create("", "", &["x"]).await.is_err());
        assert!(repo.create("Empty", "", &["  "]).await.is_err());
    }
}

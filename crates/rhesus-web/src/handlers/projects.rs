//! Project CRUD and pinned content blocks.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rhesus_common::{ContentBlock, Project, RhesusError};
use rhesus_store::ProjectUpdate;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateProject {
    title: String,
    #[serde(default)]
    description: String,
}

pub async fn list(State(state): State<SharedState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list().await?))
}

pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.projects.create(&req.title, &req.description).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.require(&id).await?))
}

pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(update): Json<ProjectUpdate>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.update(&id, update).await?))
}

/// Also removes the project's conversation and recent-chat entry.
pub async fn delete(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if state.chat.delete_project(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RhesusError::NotFound(format!("Project not found: {}", id)).into())
    }
}

pub async fn add_block(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(block): Json<ContentBlock>,
) -> ApiResult<(StatusCode, Json<ContentBlock>)> {
    if block.content_type.is_progress() {
        return Err(RhesusError::InvalidInput("Job progress cannot be saved; wait for the result.".into()).into());
    }
    let saved = state.projects.add_block(&id, &block).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn remove_block(
    State(state): State<SharedState>,
    Path((id, block_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    if state.projects.remove_block(&id, &block_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RhesusError::NotFound(format!("Block not found: {}", block_id)).into())
    }
}

//! Chat endpoints. `{key}` is `general` or a project id.

use axum::extract::{Path, Query, State};
use axum::Json;
use rhesus_chat::{HistoryKey, SendRequest};
use rhesus_common::{ChatMessage, ContentBlock};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct OpenParams {
    /// Start over with a greeting; what is stored stays until the next message.
    #[serde(default)]
    fresh: bool,
}

pub async fn history(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Query(params): Query<OpenParams>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let key = HistoryKey::from(key);
    Ok(Json(state.chat.open(&key, params.fresh).await?))
}

pub async fn send(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(req): Json<SendRequest>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let key = HistoryKey::from(key);
    Ok(Json(state.chat.send_message(&key, req).await?))
}

pub async fn new_chat(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let key = HistoryKey::from(key);
    Ok(Json(state.chat.start_new_chat(&key).await?))
}

#[derive(Deserialize)]
pub struct RunPipelineRequest {
    #[serde(default)]
    target: String,
}

pub async fn run_pipeline(
    State(state): State<SharedState>,
    Path((key, pipeline_id)): Path<(String, String)>,
    Json(req): Json<RunPipelineRequest>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let key = HistoryKey::from(key);
    Ok(Json(state.chat.run_pipeline(&key, &pipeline_id, &req.target).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    project_id: String,
    block: ContentBlock,
}

/// Pin a block from this conversation to a project.
pub async fn save_to_project(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(req): Json<SaveRequest>,
) -> ApiResult<Json<ContentBlock>> {
    let key = HistoryKey::from(key);
    Ok(Json(state.chat.save_to_project(&key, &req.project_id, req.block).await?))
}

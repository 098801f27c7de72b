//! Pipeline CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rhesus_common::{Pipeline, RhesusError};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreatePipeline {
    name: String,
    #[serde(default)]
    description: String,
    /// Step prompts in run order.
    #[serde(default)]
    steps: Vec<String>,
}

pub async fn list(State(state): State<SharedState>) -> ApiResult<Json<Vec<Pipeline>>> {
    Ok(Json(state.pipelines.list().await?))
}

pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<Pipeline>)> {
    let prompts: Vec<&str> = req.steps.iter().map(String::as_str).collect();
    let pipeline = state.pipelines.create(&req.name, &req.description, &prompts).await?;
    Ok((StatusCode::CREATED, Json(pipeline)))
}

pub async fn get(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<Json<Pipeline>> {
    Ok(Json(state.pipelines.require(&id).await?))
}

/// Replace a pipeline; the path id wins over the body's.
pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(mut pipeline): Json<Pipeline>,
) -> ApiResult<Json<Pipeline>> {
    pipeline.id = id;
    Ok(Json(state.pipelines.update(pipeline).await?))
}

pub async fn delete(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if state.pipelines.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RhesusError::NotFound(format!("Pipeline not found: {}", id)).into())
    }
}

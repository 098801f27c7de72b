//! Shareable snapshots of content blocks.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rhesus_common::{ContentBlock, RhesusError, Snapshot};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ShareRequest {
    block: ContentBlock,
}

#[derive(Serialize)]
pub struct ShareResponse {
    snapshot: Snapshot,
    link: String,
}

pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<(StatusCode, Json<ShareResponse>)> {
    let (snapshot, link) = state.chat.share(req.block).await?;
    Ok((StatusCode::CREATED, Json(ShareResponse { snapshot, link })))
}

pub async fn get(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<Json<Snapshot>> {
    state
        .snapshots
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| RhesusError::NotFound(format!("Snapshot not found: {}", id)).into())
}

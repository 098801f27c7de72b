//! UniProt sequence lookup.

use axum::extract::State;
use axum::Json;
use rhesus_common::UniProtEntry;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniProtRequest {
    #[serde(default)]
    protein_name: String,
}

pub async fn fetch_sequence(
    State(state): State<SharedState>,
    Json(req): Json<UniProtRequest>,
) -> ApiResult<Json<UniProtEntry>> {
    Ok(Json(state.lookup.fetch_sequence(&req.protein_name).await?))
}

//! PDB / AlphaFold structure downloads as PDB text.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use rhesus_bioapi::StructureSource;

use crate::error::ApiResult;
use crate::state::SharedState;

const PDB_MIME: &str = "chemical/x-pdb";

pub async fn pdb(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    structure(&state, StructureSource::Pdb, &id).await
}

pub async fn alphafold(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    structure(&state, StructureSource::AlphaFold, &id).await
}

async fn structure(state: &SharedState, source: StructureSource, id: &str) -> ApiResult<impl IntoResponse> {
    let text = state.structures.read_structure(source, id).await?;
    Ok(([(header::CONTENT_TYPE, PDB_MIME)], text))
}

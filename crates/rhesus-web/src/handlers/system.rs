//! Status, recent chats and settings maintenance.

use axum::extract::State;
use axum::Json;
use rhesus_common::{ApiStatus, RecentChat};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Serialize)]
pub struct StatusResponse {
    /// Health of the model connection as seen by the last exchange.
    api: ApiStatus,
    version: &'static str,
}

pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse { api: state.chat.api_status(), version: env!("CARGO_PKG_VERSION") })
}

pub async fn recent_chats(State(state): State<SharedState>) -> ApiResult<Json<Vec<RecentChat>>> {
    Ok(Json(state.recent.list().await?))
}

/// Every stored document, keyed like the browser client's storage.
pub async fn export_settings(State(state): State<SharedState>) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(state.backup.export().await?))
}

pub async fn import_settings(
    State(state): State<SharedState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    let Value::Object(data) = data else {
        return Err(ApiError::bad_request("Invalid settings file: expected a JSON object."));
    };
    state.chat.close_all().await;
    let imported = state.backup.import(&data).await?;
    Ok(Json(json!({ "imported": imported })))
}

pub async fn reset_settings(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    state.chat.close_all().await;
    let removed = state.backup.reset().await?;
    Ok(Json(json!({ "removed": removed })))
}

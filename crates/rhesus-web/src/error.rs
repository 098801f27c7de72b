//! Mapping of domain errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rhesus_common::RhesusError;
use serde_json::json;
use tracing::error;

/// Error returned by handlers; rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub RhesusError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(RhesusError::InvalidInput(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RhesusError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RhesusError::NotFound(_) => StatusCode::NOT_FOUND,
            RhesusError::Security(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E: Into<RhesusError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Fallback for routes that only accept POST.
pub async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "error": "Method Not Allowed" }))).into_response()
}

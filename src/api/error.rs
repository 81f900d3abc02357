use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::db::error::StorageError;

/// Failures a handler can return. Not-found is handled by the handlers
/// themselves and never reaches this type.
#[derive(Debug)]
pub enum ApiError {
    /// Storage failed (500, logged).
    Storage(StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Storage(err) => {
                // Log the real cause, keep the response generic
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

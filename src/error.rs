//! Error types for Athletes Sync

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::record::RecordId;

/// Result type for client and controller operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failure of a single sync operation
///
/// Every variant is terminal for the attempt that produced it. Nothing here
/// is retried.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Rejected by server: {0}")]
    Validation(String),

    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Invalid draft: {0}")]
    InvalidDraft(String),

    #[error("Controller has been disposed")]
    Disposed,

    #[error("Cancelled before completion")]
    Cancelled,
}

impl SyncError {
    /// Short machine-readable kind, used in logs and the view channel
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Network(_) => "network",
            SyncError::Decode(_) => "decode",
            SyncError::Validation(_) => "validation",
            SyncError::NotFound(_) => "not_found",
            SyncError::InvalidDraft(_) => "invalid_draft",
            SyncError::Disposed => "disposed",
            SyncError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

/// Error type for the mock backend's HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable entity: {0}")]
    Unprocessable(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Unprocessable(msg) => {
                tracing::debug!("Rejected payload: {}", msg);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    msg.clone(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

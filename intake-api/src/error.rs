//! Error types for intake-api
//!
//! Every request failure converts to a `{success: false, message, ...}` JSON
//! body at the handler boundary.

use axum::{
    extract::multipart::MultipartRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use intake_common::model::SchemaViolations;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::upload::{SinkError, UploadError};

/// API error type
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Required submission fields missing (400)
    #[error("Missing required fields")]
    MissingFields(Vec<String>),

    /// Rejected or oversized file (400); unreadable multipart stream (500)
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Request body is not multipart at all (500)
    #[error("Malformed submission: {0}")]
    MalformedBody(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Record failed the schema pass (500)
    #[error(transparent)]
    Validation(#[from] SchemaViolations),

    /// Object storage failure (500)
    #[error(transparent)]
    Storage(#[from] SinkError),

    /// Storage layer failure (500)
    #[error("Database error")]
    Database(#[from] intake_common::Error),
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            IntakeError::MissingFields(missing) => (
                StatusCode::BAD_REQUEST,
                json!({"success": false, "message": self.to_string(), "missing": missing}),
            ),
            IntakeError::Upload(UploadError::RejectedType { .. } | UploadError::TooLarge { .. }) => (
                StatusCode::BAD_REQUEST,
                json!({"success": false, "message": self.to_string()}),
            ),
            IntakeError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({"success": false, "message": self.to_string()}),
            ),
            IntakeError::Database(err) => {
                error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"success": false, "message": self.to_string(), "error": err.to_string()}),
                )
            }
            IntakeError::Upload(UploadError::Multipart(_))
            | IntakeError::MalformedBody(_)
            | IntakeError::Validation(_)
            | IntakeError::Storage(_) => {
                error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"success": false, "message": self.to_string()}),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<MultipartRejection> for IntakeError {
    fn from(rejection: MultipartRejection) -> Self {
        IntakeError::MalformedBody(rejection.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, IntakeError>;

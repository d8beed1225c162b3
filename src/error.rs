// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StorageError;

/// Application error type that converts to HTTP responses.
///
/// A duplicate scan is not an error; see [`crate::models::ScanOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Empty or malformed identifiers, rejected before storage is touched.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Request body that is not the expected JSON shape.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Backend unavailable or an unexpected constraint failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Whether the failure came from the storage backend rather than the caller.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        // Duplicates are classified by the ledger; one reaching here was not expected.
        AppError::Storage(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(msg.clone()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::SERVICE_UNAVAILABLE, "storage_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

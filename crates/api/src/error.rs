//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bus::BusError;
use jobs::JobError;
use serde_json::{Value, json};
use store::StoreError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed schema validation.
    #[error("Invalid request: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// The dispatch chain failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A stored job could not be read.
    #[error(transparent)]
    Job(#[from] JobError),

    /// Store lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Bus(_) | ApiError::Job(_) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body: `{"errors": [...]}` for validation failures, `{"error": "..."}` otherwise.
    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!({ "errors": errors }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, axum::Json(self.body())).into_response()
    }
}

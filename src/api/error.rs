//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::splitter::SplitError;
use crate::pipeline::synthesize::SynthesizeError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Blocks could not be created: {0}")]
    Unprocessable(String),
    #[error("Oracle failed: {0}")]
    Upstream(String),
    #[error("Run exceeded the {secs}s ceiling")]
    Timeout { secs: u64 },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Unprocessable(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BLOCK_CREATION_FAILED",
                detail.clone(),
            ),
            ApiError::Upstream(detail) => (StatusCode::BAD_GATEWAY, "ORACLE_FAILED", detail.clone()),
            ApiError::Timeout { secs } => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                format!("Run exceeded the {secs}s ceiling and was cancelled"),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<SplitError> for ApiError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::EmptyRequest => ApiError::BadRequest(err.to_string()),
            SplitError::Oracle(_) | SplitError::MalformedResponse(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<SynthesizeError> for ApiError {
    fn from(err: SynthesizeError) -> Self {
        ApiError::Unprocessable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("pipeline task failed: {err}"))
    }
}

//! API endpoint handlers.

pub mod health;
pub mod pipeline;

use axum::http::Uri;

use crate::api::error::ApiError;

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

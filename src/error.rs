//! Error types for the Marginalia server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;
use crate::identity::IdentityError;
use crate::store::transfer::TransferError;
use crate::store::StoreError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid document identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn store_failure(e: &StoreError) -> (StatusCode, &'static str, String) {
    tracing::error!("Store error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage_error",
        "Storage error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Identity(e) => (StatusCode::BAD_REQUEST, "invalid_identity", e.to_string()),
            AppError::Engine(e) => match e {
                EngineError::Disabled => (StatusCode::CONFLICT, "disabled", e.to_string()),
                EngineError::SelectionNotFound(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "selection_not_found", e.to_string())
                }
                EngineError::Anchor(inner) => (StatusCode::UNPROCESSABLE_ENTITY, "anchor_error", inner.to_string()),
                EngineError::Html(inner) => (StatusCode::BAD_REQUEST, "html_error", inner.to_string()),
                EngineError::Store(inner) => store_failure(inner),
            },
            AppError::Store(e) => store_failure(e),
            AppError::Transfer(e) => match e {
                TransferError::Store(inner) => store_failure(inner),
                _ => (StatusCode::BAD_REQUEST, "invalid_bundle", e.to_string()),
            },
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

//! Application error types.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use warden_core::auth::AuthError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Per-field validation messages, keyed by lowercase field name.
    #[error("Invalid request body")]
    InvalidFields(BTreeMap<&'static str, String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::InvalidFields(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Invalid request body",
            ),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Internal(detail) => {
                error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Something went wrong",
                )
            }
        };
        let message = message.to_string();
        let fields = match self {
            AppError::InvalidFields(fields) => Some(fields),
            _ => None,
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            fields,
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::UsernameTaken | AuthError::EmailTaken => AppError::Conflict(e.to_string()),
            AuthError::Validation(msg) => AppError::Validation(msg),
            e if e.is_auth_failure() => AppError::Unauthorized("Unauthorized".into()),
            e => AppError::Internal(e.to_string()),
        }
    }
}

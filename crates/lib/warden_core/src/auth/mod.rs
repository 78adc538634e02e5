//! Authentication logic.
//!
//! Provides password hashing, JWT issuance/verification, opaque refresh
//! secrets, and the [`service::AuthService`] session state machine that
//! composes them with the user directory and refresh token store.

pub mod jwt;
pub mod password;
pub mod secrets;
pub mod service;

use thiserror::Error;

use crate::models::auth::TokenKind;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Refresh token reuse detected")]
    ReuseDetected,

    #[error("Token expired")]
    Expired,

    #[error("Refresh token does not match")]
    TokenMismatch,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Wrong token kind: expected {expected}, found {found}")]
    WrongTokenKind { expected: TokenKind, found: TokenKind },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Username has been taken")]
    UsernameTaken,

    #[error("Email has been taken")]
    EmailTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Entropy error: {0}")]
    Entropy(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the error means "the caller is not authenticated" as opposed
    /// to an infrastructure failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::NotFound(_)
                | AuthError::InvalidCredentials
                | AuthError::ReuseDetected
                | AuthError::Expired
                | AuthError::TokenMismatch
                | AuthError::Malformed(_)
                | AuthError::InvalidSignature
                | AuthError::WrongTokenKind { .. }
                | AuthError::Unauthorized
        )
    }
}

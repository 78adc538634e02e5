//! Authentication middleware: Bearer token extraction and access token
//! verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// Id of the user the request's access token was issued to.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies it as
/// an access token and injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))?;

    let user_id = state.auth.validate_access_token(token)?;
    request.extensions_mut().insert(AuthenticatedUser(user_id));

    Ok(next.run(request).await)
}

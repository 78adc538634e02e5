//! User handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;
use warden_core::models::auth::ProfileUpdate;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{UpdateUserRequest, UserResponse, UsersResponse};
use crate::validation;

/// `GET /users`
pub async fn list_users_handler(State(state): State<AppState>) -> AppResult<Json<UsersResponse>> {
    let users = state.auth.list_users().await?;
    Ok(Json(UsersResponse { users }))
}

/// `GET /users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.auth.current_user(id).await?;
    Ok(Json(UserResponse { user }))
}

/// `PUT /users/{id}`: users may only edit themselves.
pub async fn update_user_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    if caller.0 != id {
        return Err(AppError::Forbidden("Cannot modify another user".into()));
    }
    validation::validate_update(&body)?;

    let user = state
        .auth
        .update_profile(
            id,
            ProfileUpdate {
                name: body.name,
                username: body.username,
                email: body.email,
                password: body.password,
            },
        )
        .await?;
    Ok(Json(UserResponse { user }))
}

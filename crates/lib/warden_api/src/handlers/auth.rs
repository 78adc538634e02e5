//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};
use warden_core::auth::AuthError;
use warden_core::models::auth::NewAccount;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, LoginResponse, MessageResponse, RegisterRequest, TokenResponse, UserResponse,
    VerifyEmailRequest, bearer,
};
use crate::services::cookies::{self, SessionCookies};
use crate::validation;

/// `POST /auth/register`: create a credentials account and mail a
/// verification link.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    validation::validate_register(&body)?;
    let user = state
        .auth
        .register(NewAccount {
            name: body.name,
            username: body.username,
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "An email has been sent to {}. Please follow the instruction to verify your account.",
            user.email
        ))),
    ))
}

/// `POST /auth`: authenticate with email-or-username and password.
///
/// A device id cookie already held by the client is reused, so logging in
/// again from the same browser replaces that device's session.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    validation::validate_login(&body)?;
    let outcome = state
        .auth
        .login(&body.identity, &body.password, cookies::device_id(&jar))
        .await
        .map_err(|e| match e {
            // Unknown identity and wrong password look the same on the wire.
            AuthError::NotFound(_) | AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid credentials".into())
            }
            e => e.into(),
        })?;

    let jar = cookies::set_session(
        jar,
        &outcome.refresh_token,
        outcome.user.id,
        outcome.device_id,
        state.config.cookie_secure,
    );
    Ok((
        jar,
        Json(LoginResponse {
            user: outcome.user,
            token: bearer(&outcome.access_token),
        }),
    ))
}

/// `POST /auth/refresh-token`: rotate the refresh cookie and issue a new
/// access token. Any failure clears the session cookies.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), (CookieJar, AppError)> {
    let secure = state.config.cookie_secure;
    let Some(session) = SessionCookies::from_jar(&jar) else {
        debug!("refresh without a complete session cookie set");
        return Err((
            cookies::clear_session(jar, secure),
            AppError::Unauthorized("Unauthorized".into()),
        ));
    };

    match state
        .auth
        .refresh_session(&session.refresh_token, session.user_id, session.device_id)
        .await
    {
        Ok(outcome) => Ok((
            jar.add(cookies::refresh_cookie(&outcome.refresh_token, secure)),
            Json(TokenResponse {
                token: bearer(&outcome.access_token),
            }),
        )),
        Err(e) if e.is_auth_failure() => Err((
            cookies::clear_session(jar, secure),
            AppError::Unauthorized("Unauthorized".into()),
        )),
        Err(e) => Err((cookies::clear_session(jar, secure), e.into())),
    }
}

/// `POST /auth/logout`: drop this device's session. Always succeeds from
/// the client's point of view.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(session) = SessionCookies::from_jar(&jar)
        && let Err(e) = state.auth.logout(session.user_id, session.device_id).await
    {
        warn!(user_id = %session.user_id, "logout could not delete session: {e}");
    }
    (
        cookies::clear_session(jar, state.config.cookie_secure),
        Json(MessageResponse::new("Logout")),
    )
}

/// `GET /auth`: the authenticated user.
pub async fn me_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.auth.current_user(user.0).await?;
    Ok(Json(UserResponse { user }))
}

/// `POST /auth/verify-email`: check a verification token from the mailed
/// link.
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state.auth.confirm_email(&body.token).await.map_err(|e| {
        if e.is_auth_failure() {
            AppError::Unauthorized("Invalid or expired verification token".into())
        } else {
            e.into()
        }
    })?;
    Ok(Json(UserResponse { user }))
}

//! Session cookies.
//!
//! A browser session is three cookies: the raw refresh secret (HttpOnly),
//! the device id and the user id. The refresh endpoint needs all three.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use uuid::Uuid;

pub const REFRESH_COOKIE: &str = "refresh_token";
pub const DEVICE_COOKIE: &str = "device_id";
pub const USER_COOKIE: &str = "user_id";

/// Lifetime of all session cookies.
pub const SESSION_COOKIE_DAYS: i64 = 365;

fn build(name: &'static str, value: String, http_only: bool, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(SESSION_COOKIE_DAYS))
        .build()
}

fn expired(name: &'static str, http_only: bool, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub fn refresh_cookie(secret: &str, secure: bool) -> Cookie<'static> {
    build(REFRESH_COOKIE, secret.to_string(), true, secure)
}

/// Adds all three session cookies.
pub fn set_session(
    jar: CookieJar,
    secret: &str,
    user_id: Uuid,
    device_id: Uuid,
    secure: bool,
) -> CookieJar {
    jar.add(refresh_cookie(secret, secure))
        .add(build(DEVICE_COOKIE, device_id.to_string(), false, secure))
        .add(build(USER_COOKIE, user_id.to_string(), false, secure))
}

/// Overwrites all three session cookies with expired blanks.
pub fn clear_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired(REFRESH_COOKIE, true, secure))
        .add(expired(DEVICE_COOKIE, false, secure))
        .add(expired(USER_COOKIE, false, secure))
}

/// Session cookies as presented by the client.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    pub refresh_token: String,
    pub user_id: Uuid,
    pub device_id: Uuid,
}

impl SessionCookies {
    /// `None` if any cookie is missing, empty or not a UUID where one is
    /// expected.
    pub fn from_jar(jar: &CookieJar) -> Option<Self> {
        let refresh_token = jar
            .get(REFRESH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())?;
        let user_id = jar.get(USER_COOKIE)?.value().parse().ok()?;
        let device_id = jar.get(DEVICE_COOKIE)?.value().parse().ok()?;
        Some(Self {
            refresh_token,
            user_id,
            device_id,
        })
    }
}

/// Device id from the jar, if present and well formed.
pub fn device_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(DEVICE_COOKIE)?.value().parse().ok()
}

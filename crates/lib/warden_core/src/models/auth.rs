//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `warden_api::models`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// How the account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Credentials,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Credentials => "credentials",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credentials" => Ok(Provider::Credentials),
            "google" => Ok(Provider::Google),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Domain user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub provider: Provider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    /// Present only for [`Provider::Credentials`] accounts.
    pub password_hash: Option<String>,
}

/// Fields required to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial update of a user row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == UserPatch::default()
    }
}

/// Registration input, already validated by the caller.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile change requested by a user. The password is plaintext here and
/// is hashed before it reaches the directory.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Server-side refresh token record, one per (user, device) slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    pub user_id: Uuid,
    pub device_id: Uuid,
    /// Fingerprint of the live secret.
    pub secret_hash: String,
    /// Fingerprints of every secret rotated out since the slot was last
    /// opened, oldest first.
    pub retired_hashes: Vec<String>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether `hash` was once live in this slot and has since been rotated out.
    pub fn was_rotated_out(&self, hash: &str) -> bool {
        self.retired_hashes.iter().any(|h| h == hash)
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    /// Raw refresh secret. This is the only time it leaves the server.
    pub refresh_token: String,
    pub device_id: Uuid,
}

/// Result of a successful refresh rotation.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT claims embedded in issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID.
    pub sub: Uuid,
    /// Expiry (unix timestamp, seconds).
    pub exp: i64,
    /// Issued at (unix timestamp, seconds).
    pub iat: i64,
    /// Token id.
    pub jti: Uuid,
    /// Token kind discriminator.
    pub typ: TokenKind,
}

/// What a signed token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Verification,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Verification => "verification",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_and_provider_parse_their_own_display() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        for provider in [Provider::Credentials, Provider::Google] {
            assert_eq!(provider.to_string().parse::<Provider>(), Ok(provider));
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn token_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TokenKind::Verification).unwrap();
        assert_eq!(json, "\"verification\"");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            name: Some("Jane".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}

//! User directory: lookup, creation and update of accounts.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::models::auth::{NewUser, User, UserPatch, UserWithPassword};

pub use memory::MemoryUserDirectory;
pub use postgres::PgUserDirectory;

/// How a login identity is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Email,
    Username,
}

impl IdentityKind {
    /// Anything containing `@` is an email, everything else a username.
    pub fn classify(identity: &str) -> Self {
        if identity.contains('@') {
            IdentityKind::Email
        } else {
            IdentityKind::Username
        }
    }
}

/// Account storage. Owns every user row.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<UserWithPassword, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<UserWithPassword, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<UserWithPassword, AuthError>;

    /// Resolve an email-or-username login identity.
    async fn find_by_identity(&self, identity: &str) -> Result<UserWithPassword, AuthError> {
        match IdentityKind::classify(identity) {
            IdentityKind::Email => self.find_by_email(identity).await,
            IdentityKind::Username => self.find_by_username(identity).await,
        }
    }

    /// Insert a credentials account. Uniqueness violations surface as
    /// `UsernameTaken` / `EmailTaken`.
    async fn create(&self, new_user: NewUser) -> Result<User, AuthError>;

    /// Apply a partial update and bump `updated_at`.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, AuthError>;

    async fn list(&self) -> Result<Vec<User>, AuthError>;
}

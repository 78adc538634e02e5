//! PostgreSQL-backed user directory (`users` table).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::UserDirectory;
use crate::auth::AuthError;
use crate::models::auth::{NewUser, User, UserPatch, UserWithPassword};

const USER_COLUMNS: &str =
    "id, name, username, email, password_hash, provider, role, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<UserWithPassword, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(AuthError::NotFound("user"))?.try_into()
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    username: String,
    email: String,
    password_hash: Option<String>,
    provider: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserWithPassword {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserWithPassword {
            user: User {
                id: row.id,
                name: row.name,
                username: row.username,
                email: row.email,
                role: row.role.parse().map_err(AuthError::Storage)?,
                provider: row.provider.parse().map_err(AuthError::Storage)?,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            password_hash: row.password_hash,
        })
    }
}

/// Map unique-constraint violations on `users` to domain errors.
fn map_unique_violation(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        match db.constraint() {
            Some("users_username_key") => return AuthError::UsernameTaken,
            Some("users_email_key") => return AuthError::EmailTaken,
            _ => {}
        }
    }
    AuthError::DbError(e)
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<UserWithPassword, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(AuthError::NotFound("user"))?.try_into()
    }

    async fn find_by_username(&self, username: &str) -> Result<UserWithPassword, AuthError> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<UserWithPassword, AuthError> {
        self.find_one("email", email).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AuthError> {
        let sql = format!(
            "INSERT INTO users (name, username, email, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new_user.name)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        let created: UserWithPassword = row.try_into()?;
        Ok(created.user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, AuthError> {
        let sql = format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 username = COALESCE($3, username), \
                 email = COALESCE($4, email), \
                 password_hash = COALESCE($5, password_hash), \
                 role = COALESCE($6, role), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.username)
            .bind(patch.email)
            .bind(patch.password_hash)
            .bind(patch.role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        let updated: UserWithPassword = row.ok_or(AuthError::NotFound("user"))?.try_into()?;
        Ok(updated.user)
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| UserWithPassword::try_from(row).map(|u| u.user))
            .collect()
    }
}

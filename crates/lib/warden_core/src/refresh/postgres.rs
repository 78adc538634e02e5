//! PostgreSQL-backed refresh token store.
//!
//! Live slots are rows of `refresh_tokens`; fingerprints rotated out of a
//! slot go to `refresh_token_history`, which cascades with its slot.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RefreshTokenStore;
use crate::auth::AuthError;
use crate::models::auth::RefreshRecord;

#[derive(Debug, Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshRow {
    user_id: Uuid,
    device_id: Uuid,
    secret_hash: String,
    retired_hashes: Vec<String>,
    revoked: bool,
    created_at: DateTime<Utc>,
    expired_at: DateTime<Utc>,
}

impl From<RefreshRow> for RefreshRecord {
    fn from(row: RefreshRow) -> Self {
        RefreshRecord {
            user_id: row.user_id,
            device_id: row.device_id,
            secret_hash: row.secret_hash,
            retired_hashes: row.retired_hashes,
            revoked: row.revoked,
            created_at: row.created_at,
            expires_at: row.expired_at,
        }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn put(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        secret_hash: &str,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM refresh_token_history WHERE user_id = $1 AND device_id = $2")
            .bind(user_id)
            .bind(device_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, device_id, secret_hash, expired_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, device_id) DO UPDATE \
             SET secret_hash = EXCLUDED.secret_hash, \
                 revoked = FALSE, \
                 created_at = now(), \
                 expired_at = EXCLUDED.expired_at",
        )
        .bind(user_id)
        .bind(device_id)
        .bind(secret_hash)
        .bind(Utc::now() + ttl)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid, device_id: Uuid) -> Result<RefreshRecord, AuthError> {
        let row = sqlx::query_as::<_, RefreshRow>(
            "SELECT r.user_id, r.device_id, r.secret_hash, r.revoked, r.created_at, r.expired_at, \
                    ARRAY(SELECT h.secret_hash FROM refresh_token_history h \
                          WHERE h.user_id = r.user_id AND h.device_id = r.device_id \
                          ORDER BY h.id) AS retired_hashes \
             FROM refresh_tokens r \
             WHERE r.user_id = $1 AND r.device_id = $2",
        )
        .bind(user_id)
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RefreshRecord::from)
            .ok_or(AuthError::NotFound("refresh token"))
    }

    async fn delete(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND device_id = $2")
            .bind(user_id)
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        ttl: Duration,
    ) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await?;
        // Conditional UPDATE: the row lock makes concurrent rotations of the
        // same slot serialize, and only one can still match.
        let result = sqlx::query(
            "UPDATE refresh_tokens \
             SET secret_hash = $4, \
                 created_at = now(), \
                 expired_at = $5 \
             WHERE user_id = $1 AND device_id = $2 \
               AND secret_hash = $3 AND revoked = FALSE",
        )
        .bind(user_id)
        .bind(device_id)
        .bind(expected_hash)
        .bind(new_hash)
        .bind(Utc::now() + ttl)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO refresh_token_history (user_id, device_id, secret_hash) \
             VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(device_id)
        .bind(expected_hash)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn revoke(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND device_id = $2",
        )
        .bind(user_id)
        .bind(device_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expired_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

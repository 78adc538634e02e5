//! Refresh token storage.
//!
//! One record per (user, device) slot. The raw secret is never stored, only
//! its fingerprint. Two backings implement [`RefreshTokenStore`]:
//! [`postgres::PgRefreshTokenStore`] and the cache-style
//! [`memory::MemoryRefreshTokenStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::models::auth::RefreshRecord;

pub use memory::MemoryRefreshTokenStore;
pub use postgres::PgRefreshTokenStore;

/// Persistence of refresh token records keyed by (user, device).
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert or overwrite the record for the slot. Clears any revocation and
    /// the rotation history.
    async fn put(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        secret_hash: &str,
        ttl: Duration,
    ) -> Result<(), AuthError>;

    /// Fetch the record for the slot. Expired records are still returned.
    async fn get(&self, user_id: Uuid, device_id: Uuid) -> Result<RefreshRecord, AuthError>;

    /// Remove the record for the slot. Missing records are not an error.
    async fn delete(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError>;

    /// Atomically replace `expected_hash` with `new_hash` and a fresh expiry.
    ///
    /// Returns `false` when the slot is gone, revoked, or no longer holds
    /// `expected_hash`. On success the old fingerprint is appended to the
    /// slot's retired hashes, which are kept until the slot is reopened,
    /// deleted or purged.
    async fn rotate(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        ttl: Duration,
    ) -> Result<bool, AuthError>;

    /// Mark the slot revoked. Missing records are not an error.
    async fn revoke(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError>;

    /// Mark every slot of the user revoked, returning how many were touched.
    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError>;

    /// Drop expired records, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, AuthError>;
}

//! In-process refresh token store with per-key expiry.
//!
//! Slots live in a sharded [`DashMap`]; every mutation goes through the
//! entry API so writes to one slot are serialized while different slots
//! proceed independently.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::RefreshTokenStore;
use crate::auth::AuthError;
use crate::models::auth::RefreshRecord;

type Slot = (Uuid, Uuid);

#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStore {
    records: DashMap<Slot, RefreshRecord>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace a record wholesale. Lets callers seed state such as an
    /// already-expired slot.
    pub fn insert_record(&self, record: RefreshRecord) {
        self.records
            .insert((record.user_id, record.device_id), record);
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn put(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        secret_hash: &str,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let now = Utc::now();
        self.records.insert(
            (user_id, device_id),
            RefreshRecord {
                user_id,
                device_id,
                secret_hash: secret_hash.to_string(),
                retired_hashes: Vec::new(),
                revoked: false,
                created_at: now,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, user_id: Uuid, device_id: Uuid) -> Result<RefreshRecord, AuthError> {
        self.records
            .get(&(user_id, device_id))
            .map(|r| r.value().clone())
            .ok_or(AuthError::NotFound("refresh token"))
    }

    async fn delete(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError> {
        self.records.remove(&(user_id, device_id));
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
        match self.records.entry((user_id, device_id)) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if record.revoked || record.secret_hash != expected_hash {
                    return Ok(false);
                }
                let now = Utc::now();
                let retired = std::mem::replace(&mut record.secret_hash, new_hash.to_string());
                record.retired_hashes.push(retired);
                record.created_at = now;
                record.expires_at = now + ttl;
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn revoke(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError> {
        if let Some(mut record) = self.records.get_mut(&(user_id, device_id)) {
            record.revoked = true;
        }
        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let mut touched = 0;
        for mut record in self.records.iter_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = Utc::now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired_at(now));
        Ok(before.saturating_sub(self.records.len()) as u64)
    }
}

//! Federated capability cache.
//!
//! Capability sets negotiated through a federation proxy, keyed by the
//! (account, remote server, room token) triple. Each entry carries the proxy
//! hash it was negotiated under; an entry whose stored hash no longer matches
//! the hash from the room's federation metadata is stale and is treated as a
//! cache miss, never returned.

use super::DbError;
use crate::caps::CapabilitySet;
use serde_json::Value;
use sqlx::SqlitePool;

/// One cached federated capability entry.
#[derive(Debug, Clone)]
pub struct FederatedCapabilities {
    pub account_id: String,
    pub remote_server: String,
    pub room_token: String,
    pub capabilities: CapabilitySet,
    pub proxy_hash: String,
    pub updated_at: i64,
}

/// Repository for the federated capability cache.
pub struct FederatedCapabilityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FederatedCapabilityRepository<'a> {
    /// Create a new federated capability repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store or overwrite the entry for a (account, remote server, room) triple.
    pub async fn put(
        &self,
        account_id: &str,
        remote_server: &str,
        room_token: &str,
        payload: &Value,
        proxy_hash: &str,
    ) -> Result<CapabilitySet, DbError> {
        let capabilities = CapabilitySet::parse(payload);
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO federated_capabilities
                (account_id, remote_server, room_token, caps_json, proxy_hash, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (account_id, remote_server, room_token) DO UPDATE SET
                caps_json = excluded.caps_json,
                proxy_hash = excluded.proxy_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account_id)
        .bind(remote_server)
        .bind(room_token)
        .bind(capabilities.to_json().to_string())
        .bind(proxy_hash)
        .bind(now)
        .execute(self.pool)
        .await?;

        tracing::debug!(
            account_id = %account_id,
            remote_server = %remote_server,
            room_token = %room_token,
            "Federated capabilities stored"
        );

        Ok(capabilities)
    }

    /// Look up an entry, validating it against the expected proxy hash.
    ///
    /// A stored hash different from `expected_proxy_hash` means the entry was
    /// negotiated against a since-rotated proxy configuration; it reads as a
    /// miss and the caller is responsible for re-fetching and re-putting.
    pub async fn get(
        &self,
        account_id: &str,
        remote_server: &str,
        room_token: &str,
        expected_proxy_hash: &str,
    ) -> Result<Option<FederatedCapabilities>, DbError> {
        let row = sqlx::query_as::<_, (String, String, i64)>(
            r#"
            SELECT caps_json, proxy_hash, updated_at
            FROM federated_capabilities
            WHERE account_id = ? AND remote_server = ? AND room_token = ?
            "#,
        )
        .bind(account_id)
        .bind(remote_server)
        .bind(room_token)
        .fetch_optional(self.pool)
        .await?;

        let Some((caps_json, proxy_hash, updated_at)) = row else {
            return Ok(None);
        };

        if proxy_hash != expected_proxy_hash {
            tracing::debug!(
                account_id = %account_id,
                room_token = %room_token,
                "Federated capability entry stale, proxy hash rotated"
            );
            return Ok(None);
        }

        Ok(Some(FederatedCapabilities {
            account_id: account_id.to_string(),
            remote_server: remote_server.to_string(),
            room_token: room_token.to_string(),
            capabilities: CapabilitySet::from_stored(&caps_json),
            proxy_hash,
            updated_at,
        }))
    }

    /// Drop every cached entry for a room, regardless of remote server.
    ///
    /// Called when a room is deleted; entries under a deleted room are
    /// unreachable through normal resolution and would otherwise linger.
    pub async fn evict_room(&self, account_id: &str, room_token: &str) -> Result<u64, DbError> {
        let result = sqlx::query(
            "DELETE FROM federated_capabilities WHERE account_id = ? AND room_token = ?",
        )
        .bind(account_id)
        .bind(room_token)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

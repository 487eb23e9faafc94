//! Minimal room projection for capability resolution.
//!
//! The full conversation model lives outside this core; resolution only
//! needs to know whether a room is federated, which remote server hosts it,
//! and the proxy hash from its federation metadata.

use super::DbError;
use sqlx::SqlitePool;

/// The slice of a conversation that capability resolution sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub account_id: String,
    pub token: String,
    /// Host of the federated conversation; `None` for local rooms.
    pub remote_server: Option<String>,
    /// Proxy hash from the room's federation metadata. Empty for local rooms.
    pub proxy_hash: String,
}

impl Room {
    /// Whether this room lives on a federated server.
    pub fn is_federated(&self) -> bool {
        self.remote_server.is_some()
    }
}

/// Repository for room projections.
pub struct RoomRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoomRepository<'a> {
    /// Create a new room repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update a room projection.
    pub async fn upsert(&self, room: &Room) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO rooms (account_id, token, remote_server, proxy_hash)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (account_id, token) DO UPDATE SET
                remote_server = excluded.remote_server,
                proxy_hash = excluded.proxy_hash
            "#,
        )
        .bind(&room.account_id)
        .bind(&room.token)
        .bind(&room.remote_server)
        .bind(&room.proxy_hash)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Find a room by token for an account.
    pub async fn by_token(
        &self,
        account_id: &str,
        token: &str,
    ) -> Result<Option<Room>, DbError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>, String)>(
            "SELECT account_id, token, remote_server, proxy_hash FROM rooms \
             WHERE account_id = ? AND token = ?",
        )
        .bind(account_id)
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(account_id, token, remote_server, proxy_hash)| Room {
            account_id,
            token,
            remote_server,
            proxy_hash,
        }))
    }

    /// Delete a room projection. Returns whether a row existed.
    pub async fn remove(&self, account_id: &str, token: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM rooms WHERE account_id = ? AND token = ?")
            .bind(account_id)
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

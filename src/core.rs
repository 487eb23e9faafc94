//! Process-wide facade over the account and capability store.
//!
//! [`TalkCore`] owns the database handle, an in-memory snapshot of parsed
//! server capability sets, and the change-event bus. It is the only
//! component allowed to flip the active-account flag or refresh the
//! snapshot, so every mutation funnels through here as a short transaction
//! against the backing store.

use crate::caps::{CapabilitySet, flags};
use crate::config::CoreConfig;
use crate::db::{Account, Database, DbError, Room, ServerCapabilities};
use crate::events::{ChangeEvent, EventBus};
use crate::translations::{self, Translation};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// The account-and-capability coordinator.
///
/// Cheap to clone; clones share the pool, the snapshot, and the bus. Clients
/// construct one per process, hand out clones to the foreground and network
/// callback paths, and call [`shutdown`](Self::shutdown) on exit.
#[derive(Clone)]
pub struct TalkCore {
    db: Database,
    events: EventBus,
    /// Parsed server capability sets by account id, refreshed on every
    /// capability write-commit so read-path checks skip the store.
    caps_snapshot: Arc<DashMap<String, CapabilitySet>>,
    /// Orders each {store commit, snapshot refresh} pair. Two concurrent
    /// renegotiations must not commit in one order and refresh the snapshot
    /// in the other, and an account removal must not interleave with a
    /// refresh for the removed id.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl TalkCore {
    /// Open the store described by `config`.
    pub async fn open(config: &CoreConfig) -> Result<Self, DbError> {
        let db = Database::open(&config.database_path).await?;
        Ok(Self {
            db,
            events: EventBus::new(config.event_capacity),
            caps_snapshot: Arc::new(DashMap::new()),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Wrap an already-opened database handle.
    pub fn with_database(db: Database) -> Self {
        Self {
            db,
            events: EventBus::default(),
            caps_snapshot: Arc::new(DashMap::new()),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Close the backing store. Pending writes are flushed first.
    pub async fn shutdown(&self) {
        self.db.close().await;
    }

    /// Access the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Account registry
    // ------------------------------------------------------------------

    /// Create an account for a (user, server) pairing.
    ///
    /// See [`crate::db::account_id_for`] for the id derivation. Duplicate
    /// pairings are rejected with [`DbError::AccountExists`].
    pub async fn create_account(&self, user_id: &str, server: &str) -> Result<Account, DbError> {
        self.db.accounts().create(user_id, server).await
    }

    /// All accounts, in insertion order.
    pub async fn accounts(&self) -> Result<Vec<Account>, DbError> {
        self.db.accounts().all().await
    }

    /// Accounts without the active flag, in insertion order.
    pub async fn inactive_accounts(&self) -> Result<Vec<Account>, DbError> {
        self.db.accounts().inactive().await
    }

    /// Number of signed-in accounts.
    pub async fn number_of_accounts(&self) -> Result<i64, DbError> {
        self.db.accounts().count().await
    }

    /// Look up an account by id; absent ids are not an error.
    pub async fn account_by_id(&self, account_id: &str) -> Result<Option<Account>, DbError> {
        self.db.accounts().by_id(account_id).await
    }

    /// Look up an account by its (user, server) pairing.
    pub async fn account_by_user_and_server(
        &self,
        user_id: &str,
        server: &str,
    ) -> Result<Option<Account>, DbError> {
        self.db.accounts().by_user_and_server(user_id, server).await
    }

    /// The account driving the foreground session.
    ///
    /// `None` only when the registry is empty; callers in normal operation
    /// may rely on an active account existing once any account does.
    pub async fn active_account(&self) -> Result<Option<Account>, DbError> {
        self.db.accounts().active().await
    }

    /// Switch the active account atomically.
    pub async fn set_active_account(&self, account_id: &str) -> Result<(), DbError> {
        self.db.accounts().set_active(account_id).await
    }

    /// Remove an account and everything it owns.
    pub async fn remove_account(&self, account_id: &str) -> Result<(), DbError> {
        let _guard = self.write_lock.lock().await;
        self.db.accounts().remove(account_id).await?;
        self.caps_snapshot.remove(account_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Unread badges
    // ------------------------------------------------------------------

    /// Adjust the unread badge by `delta`; the result never drops below zero.
    pub async fn adjust_unread_badge(&self, account_id: &str, delta: i64) -> Result<(), DbError> {
        self.db.accounts().adjust_unread_badge(account_id, delta).await?;
        Ok(())
    }

    /// Reset the unread badge to zero.
    pub async fn reset_unread_badge(&self, account_id: &str) -> Result<(), DbError> {
        self.db.accounts().reset_unread_badge(account_id).await
    }

    /// Sum of unread badges across all accounts.
    pub async fn total_unread(&self) -> Result<i64, DbError> {
        self.db.accounts().total_unread().await
    }

    /// Sum of unread badges across inactive accounts.
    pub async fn total_unread_inactive(&self) -> Result<i64, DbError> {
        self.db.accounts().total_unread_inactive().await
    }

    /// Number of inactive accounts with unread notifications.
    pub async fn inactive_accounts_with_unread(&self) -> Result<i64, DbError> {
        self.db.accounts().inactive_with_unread().await
    }

    /// Clear unread badges on every inactive account.
    pub async fn reset_unread_for_inactive(&self) -> Result<(), DbError> {
        self.db.accounts().reset_unread_inactive().await
    }

    // ------------------------------------------------------------------
    // Pending federation invitations
    // ------------------------------------------------------------------

    /// Bump the pending-invitation count by one.
    pub async fn increase_pending_invitations(&self, account_id: &str) -> Result<(), DbError> {
        if self.db.accounts().adjust_pending_invitations(account_id, 1).await? {
            self.emit_invitations_changed(account_id);
        }
        Ok(())
    }

    /// Drop the pending-invitation count by one, flooring at zero.
    pub async fn decrease_pending_invitations(&self, account_id: &str) -> Result<(), DbError> {
        if self.db.accounts().adjust_pending_invitations(account_id, -1).await? {
            self.emit_invitations_changed(account_id);
        }
        Ok(())
    }

    /// Set the pending-invitation count; negative values clamp to zero.
    pub async fn set_pending_invitations(
        &self,
        account_id: &str,
        count: i64,
    ) -> Result<(), DbError> {
        if self.db.accounts().set_pending_invitations(account_id, count).await? {
            self.emit_invitations_changed(account_id);
        }
        Ok(())
    }

    /// Record when the invitation list was last refreshed.
    pub async fn update_last_invitation_update(
        &self,
        account_id: &str,
        timestamp: i64,
    ) -> Result<(), DbError> {
        self.db
            .accounts()
            .update_last_invitation_update(account_id, timestamp)
            .await
    }

    fn emit_invitations_changed(&self, account_id: &str) {
        self.events.emit(ChangeEvent::PendingInvitationsChanged {
            account_id: account_id.to_string(),
        });
    }

    // ------------------------------------------------------------------
    // Negotiation bookkeeping
    // ------------------------------------------------------------------

    /// Store the configuration hash from the latest negotiation.
    pub async fn update_config_hash(&self, account_id: &str, hash: &str) -> Result<(), DbError> {
        self.db.accounts().update_config_hash(account_id, hash).await
    }

    /// Store the `modifiedSince` marker for incremental room fetches.
    pub async fn update_last_modified_since(
        &self,
        account_id: &str,
        modified_since: &str,
    ) -> Result<(), DbError> {
        self.db
            .accounts()
            .update_last_modified_since(account_id, modified_since)
            .await
    }

    // ------------------------------------------------------------------
    // Server capabilities
    // ------------------------------------------------------------------

    /// Replace the account's server-wide capability set wholesale.
    ///
    /// Flags from a previous payload that are absent from `payload` are gone
    /// after this call; there is no merge. The in-memory snapshot refreshes
    /// on commit.
    pub async fn set_server_capabilities(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> Result<(), DbError> {
        let _guard = self.write_lock.lock().await;
        let parsed = self.db.capabilities().replace(account_id, payload).await?;
        self.caps_snapshot.insert(account_id.to_string(), parsed);
        Ok(())
    }

    /// The full capability row for an account.
    pub async fn server_capabilities(
        &self,
        account_id: &str,
    ) -> Result<Option<ServerCapabilities>, DbError> {
        self.db.capabilities().for_account(account_id).await
    }

    /// The parsed server-wide capability set, served from the snapshot when
    /// the account negotiated in this process, from the store otherwise.
    ///
    /// Only write-commits populate the snapshot; a read here must not write
    /// an entry back, or it could race [`remove_account`](Self::remove_account)
    /// and revive a deleted account's flags.
    ///
    /// `None` means the account never completed a negotiation.
    pub async fn server_capability_set(
        &self,
        account_id: &str,
    ) -> Result<Option<CapabilitySet>, DbError> {
        if let Some(cached) = self.caps_snapshot.get(account_id) {
            return Ok(Some(cached.clone()));
        }

        Ok(self
            .db
            .capabilities()
            .for_account(account_id)
            .await?
            .map(|row| row.capabilities))
    }

    /// Whether the account's server supports `flag`. Missing accounts and
    /// missing negotiations read as unsupported.
    pub async fn server_has_capability(
        &self,
        account_id: &str,
        flag: &str,
    ) -> Result<bool, DbError> {
        Ok(self
            .server_capability_set(account_id)
            .await?
            .map(|caps| caps.has(flag))
            .unwrap_or(false))
    }

    /// Whether the server's notifications app supports `flag`.
    pub async fn server_has_notifications_capability(
        &self,
        account_id: &str,
        flag: &str,
    ) -> Result<bool, DbError> {
        Ok(self
            .server_capabilities(account_id)
            .await?
            .map(|row| row.notification_capabilities.has(flag))
            .unwrap_or(false))
    }

    /// Whether the server still meets this client's minimum feature level.
    pub async fn meets_minimum_required(&self, account_id: &str) -> Result<bool, DbError> {
        self.server_has_capability(account_id, flags::MINIMUM_REQUIRED_CAPABILITY)
            .await
    }

    /// Whether the account's server can invite federated users.
    pub async fn can_invite_federated_users(&self, account_id: &str) -> Result<bool, DbError> {
        self.server_has_capability(account_id, flags::CAP_FEDERATION_V1)
            .await
    }

    /// Record the version reported by the external signaling server.
    pub async fn set_external_signaling_server_version(
        &self,
        account_id: &str,
        version: &str,
    ) -> Result<(), DbError> {
        self.db
            .capabilities()
            .set_external_signaling_version(account_id, version)
            .await
    }

    // ------------------------------------------------------------------
    // Rooms and capability resolution
    // ------------------------------------------------------------------

    /// Store or update the room projection used for resolution.
    pub async fn upsert_room(&self, room: &Room) -> Result<(), DbError> {
        self.db.rooms().upsert(room).await
    }

    /// Look up a room projection by token.
    pub async fn room_with_token(
        &self,
        account_id: &str,
        token: &str,
    ) -> Result<Option<Room>, DbError> {
        self.db.rooms().by_token(account_id, token).await
    }

    /// Remove a room projection and evict its federated cache entries.
    ///
    /// Stale federated entries under a deleted room are unreachable through
    /// normal resolution, so deletion doubles as an invalidation trigger.
    pub async fn remove_room(&self, account_id: &str, token: &str) -> Result<(), DbError> {
        self.db.rooms().remove(account_id, token).await?;
        self.db.federated().evict_room(account_id, token).await?;
        Ok(())
    }

    /// Resolve the capability set in effect for a room.
    ///
    /// A federated room with a valid (hash-matching) cache entry resolves to
    /// that entry's set verbatim; the federated set shadows the server-wide
    /// one entirely and is never merged with it. Everything else falls back
    /// to the account's server-wide set. `None` means the account has never
    /// completed any negotiation.
    pub async fn room_capabilities(&self, room: &Room) -> Result<Option<CapabilitySet>, DbError> {
        if let Some(remote_server) = &room.remote_server
            && let Some(entry) = self
                .db
                .federated()
                .get(&room.account_id, remote_server, &room.token, &room.proxy_hash)
                .await?
        {
            return Ok(Some(entry.capabilities));
        }

        self.server_capability_set(&room.account_id).await
    }

    /// Whether `flag` is supported in the context of `room`.
    pub async fn room_has_capability(&self, room: &Room, flag: &str) -> Result<bool, DbError> {
        Ok(self
            .room_capabilities(room)
            .await?
            .map(|caps| caps.has(flag))
            .unwrap_or(false))
    }

    // ------------------------------------------------------------------
    // Federated capability cache
    // ------------------------------------------------------------------

    /// Store a federated capability set for a (remote server, room) pair.
    pub async fn set_federated_capabilities(
        &self,
        account_id: &str,
        remote_server: &str,
        room_token: &str,
        payload: &Value,
        proxy_hash: &str,
    ) -> Result<(), DbError> {
        self.db
            .federated()
            .put(account_id, remote_server, room_token, payload, proxy_hash)
            .await?;

        self.events.emit(ChangeEvent::RoomCapabilitiesChanged {
            account_id: account_id.to_string(),
            room_token: room_token.to_string(),
        });
        Ok(())
    }

    /// Fetch a federated capability set, validated against the expected
    /// proxy hash. A rotated hash reads as a miss.
    pub async fn federated_capabilities(
        &self,
        account_id: &str,
        remote_server: &str,
        room_token: &str,
        expected_proxy_hash: &str,
    ) -> Result<Option<CapabilitySet>, DbError> {
        Ok(self
            .db
            .federated()
            .get(account_id, remote_server, room_token, expected_proxy_hash)
            .await?
            .map(|entry| entry.capabilities))
    }

    // ------------------------------------------------------------------
    // Translations
    // ------------------------------------------------------------------

    /// The translation pairs available to an account.
    ///
    /// Empty unless the server advertises the translations capability;
    /// malformed entries in the server list are skipped.
    pub async fn available_translations(
        &self,
        account_id: &str,
    ) -> Result<Vec<Translation>, DbError> {
        let Some(row) = self.server_capabilities(account_id).await? else {
            return Ok(Vec::new());
        };

        if !row.capabilities.has(flags::CAP_TRANSLATIONS) {
            return Ok(Vec::new());
        }

        Ok(translations::from_raw_list(&row.translations_raw))
    }

    /// Whether the server has any translation provider configured.
    pub async fn has_translation_providers(&self, account_id: &str) -> Result<bool, DbError> {
        Ok(self
            .server_capabilities(account_id)
            .await?
            .map(|row| row.has_translation_providers)
            .unwrap_or(false))
    }

    /// Whether any translation pair is available, without materializing the
    /// list.
    ///
    /// Answers from the well-formed entry count recorded at write time, so
    /// this agrees with [`available_translations`](Self::available_translations)
    /// even when every entry in the stored list is malformed.
    pub async fn has_available_translations(&self, account_id: &str) -> Result<bool, DbError> {
        let Some(row) = self.server_capabilities(account_id).await? else {
            return Ok(false);
        };

        Ok(row.capabilities.has(flags::CAP_TRANSLATIONS) && row.translations_count > 0)
    }
}

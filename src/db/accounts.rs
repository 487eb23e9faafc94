//! Account repository: the registry of signed-in user/server pairings.
//!
//! Owns the single-active-account invariant and the per-account counters
//! (unread badge, pending federation invitations).

use super::DbError;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// One signed-in user/server pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: String,
    pub user_id: String,
    pub server: String,
    pub is_active: bool,
    pub unread_badge: i64,
    pub pending_invitations: i64,
    pub config_hash: String,
    pub last_modified_since: String,
    pub last_invitation_update: i64,
    pub created_at: i64,
}

type AccountRow = (String, String, String, bool, i64, i64, String, String, i64, i64);

const ACCOUNT_COLUMNS: &str = "account_id, user_id, server, is_active, unread_badge, \
     pending_invitations, config_hash, last_modified_since, last_invitation_update, created_at";

fn account_from_row(row: AccountRow) -> Account {
    let (
        account_id,
        user_id,
        server,
        is_active,
        unread_badge,
        pending_invitations,
        config_hash,
        last_modified_since,
        last_invitation_update,
        created_at,
    ) = row;
    Account {
        account_id,
        user_id,
        server,
        is_active,
        unread_badge,
        pending_invitations,
        config_hash,
        last_modified_since,
        last_invitation_update,
        created_at,
    }
}

/// Derive the stable account id for a (user, server) pairing.
///
/// The id is a pure function of its inputs: two calls with identical inputs
/// always produce the same id, and ids are never recycled for a different
/// pairing.
pub fn account_id_for(user_id: &str, server: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(server.as_bytes());
    hasher.update(b"#");
    hasher.update(user_id.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account for a (user, server) pairing.
    ///
    /// The very first account in the registry becomes active. Creating a
    /// duplicate pairing is a caller error, reported as
    /// [`DbError::AccountExists`] with the store unchanged.
    pub async fn create(&self, user_id: &str, server: &str) -> Result<Account, DbError> {
        let account_id = account_id_for(user_id, server);
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&mut *tx)
            .await?;
        let is_active = existing == 0;

        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, user_id, server, is_active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account_id)
        .bind(user_id)
        .bind(server)
        .bind(is_active)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::AccountExists(format!("{user_id}@{server}"));
            }
            DbError::from(e)
        })?;

        tx.commit().await?;

        tracing::info!(account_id = %account_id, server = %server, "Account created");

        Ok(Account {
            account_id,
            user_id: user_id.to_string(),
            server: server.to_string(),
            is_active,
            unread_badge: 0,
            pending_invitations: 0,
            config_hash: String::new(),
            last_modified_since: "0".to_string(),
            last_invitation_update: 0,
            created_at: now,
        })
    }

    /// All accounts in insertion order.
    pub async fn all(&self) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY rowid"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(account_from_row).collect())
    }

    /// Accounts that are not currently active, in insertion order.
    pub async fn inactive(&self) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE is_active = 0 ORDER BY rowid"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(account_from_row).collect())
    }

    /// Number of accounts in the registry.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Find account by id.
    pub async fn by_id(&self, account_id: &str) -> Result<Option<Account>, DbError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?"
        ))
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }

    /// Find account by its (user, server) pairing.
    pub async fn by_user_and_server(
        &self,
        user_id: &str,
        server: &str,
    ) -> Result<Option<Account>, DbError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ? AND server = ?"
        ))
        .bind(user_id)
        .bind(server)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }

    /// The account currently driving the foreground session, if any.
    pub async fn active(&self) -> Result<Option<Account>, DbError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE is_active = 1"
        ))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }

    /// Make `account_id` the active account.
    ///
    /// Clearing the previous flag and setting the new one happen in one
    /// transaction, so readers never observe zero or two active accounts.
    /// An unknown id leaves the store unchanged.
    pub async fn set_active(&self, account_id: &str) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE accounts SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE accounts SET is_active = 1 WHERE account_id = ?")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the cleared flag.
            return Err(DbError::AccountNotFound(account_id.to_string()));
        }

        tx.commit().await?;

        tracing::info!(account_id = %account_id, "Active account switched");
        Ok(())
    }

    /// Remove an account. Capability and room data cascade with it.
    ///
    /// When the removed account was active and others remain, the oldest
    /// remaining account is promoted so the registry never ends up non-empty
    /// without an active account. Removing an unknown id is a no-op.
    pub async fn remove(&self, account_id: &str) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let was_active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM accounts WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(was_active) = was_active else {
            return Ok(());
        };

        sqlx::query("DELETE FROM accounts WHERE account_id = ?")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        if was_active {
            sqlx::query(
                r#"
                UPDATE accounts SET is_active = 1
                WHERE rowid = (SELECT MIN(rowid) FROM accounts)
                "#,
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(account_id = %account_id, "Account removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Unread badge counters
    // ------------------------------------------------------------------

    /// Adjust the unread badge by `delta`, clamping the result at zero.
    ///
    /// Returns `false` when the account does not exist.
    pub async fn adjust_unread_badge(
        &self,
        account_id: &str,
        delta: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE accounts SET unread_badge = MAX(0, unread_badge + ?) WHERE account_id = ?",
        )
        .bind(delta)
        .bind(account_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset the unread badge to zero.
    pub async fn reset_unread_badge(&self, account_id: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET unread_badge = 0 WHERE account_id = ?")
            .bind(account_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Sum of unread badges across all accounts.
    pub async fn total_unread(&self) -> Result<i64, DbError> {
        let total = sqlx::query_scalar("SELECT COALESCE(SUM(unread_badge), 0) FROM accounts")
            .fetch_one(self.pool)
            .await?;
        Ok(total)
    }

    /// Sum of unread badges across inactive accounts.
    pub async fn total_unread_inactive(&self) -> Result<i64, DbError> {
        let total = sqlx::query_scalar(
            "SELECT COALESCE(SUM(unread_badge), 0) FROM accounts WHERE is_active = 0",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }

    /// Number of inactive accounts with a non-zero unread badge.
    pub async fn inactive_with_unread(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE is_active = 0 AND unread_badge > 0",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Clear unread badges on every inactive account.
    pub async fn reset_unread_inactive(&self) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET unread_badge = 0 WHERE is_active = 0")
            .execute(self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pending federation invitations
    // ------------------------------------------------------------------

    /// Add `delta` to the pending-invitation count, clamping at zero.
    ///
    /// Returns `false` when the account does not exist.
    pub async fn adjust_pending_invitations(
        &self,
        account_id: &str,
        delta: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE accounts SET pending_invitations = MAX(0, pending_invitations + ?) \
             WHERE account_id = ?",
        )
        .bind(delta)
        .bind(account_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the pending-invitation count outright (negative values clamp to 0).
    pub async fn set_pending_invitations(
        &self,
        account_id: &str,
        count: i64,
    ) -> Result<bool, DbError> {
        let result =
            sqlx::query("UPDATE accounts SET pending_invitations = MAX(0, ?) WHERE account_id = ?")
                .bind(count)
                .bind(account_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record when the invitation list was last refreshed from the server.
    pub async fn update_last_invitation_update(
        &self,
        account_id: &str,
        timestamp: i64,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET last_invitation_update = ? WHERE account_id = ?")
            .bind(timestamp)
            .bind(account_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Negotiation bookkeeping
    // ------------------------------------------------------------------

    /// Store the configuration hash from the latest capability negotiation.
    pub async fn update_config_hash(&self, account_id: &str, hash: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET config_hash = ? WHERE account_id = ?")
            .bind(hash)
            .bind(account_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Store the `modifiedSince` marker used by incremental room fetches.
    pub async fn update_last_modified_since(
        &self,
        account_id: &str,
        modified_since: &str,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET last_modified_since = ? WHERE account_id = ?")
            .bind(modified_since)
            .bind(account_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

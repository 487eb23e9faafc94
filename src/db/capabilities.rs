//! Server-wide capability storage, one row per account.
//!
//! Rows are replaced wholesale on every successful negotiation. A partial
//! update must never leave flags from a previous payload behind, so there is
//! deliberately no field-by-field merge path here.

use super::DbError;
use crate::caps::CapabilitySet;
use serde_json::Value;
use sqlx::SqlitePool;

/// The capability state negotiated with an account's own server.
#[derive(Debug, Clone)]
pub struct ServerCapabilities {
    pub account_id: String,
    pub capabilities: CapabilitySet,
    pub notification_capabilities: CapabilitySet,
    pub signaling_version: i64,
    pub external_signaling_version: String,
    /// Raw server-provided translation pair list, projected lazily.
    pub translations_raw: String,
    /// Number of well-formed entries in `translations_raw`, counted when the
    /// row is written so availability checks need not reparse the list.
    pub translations_count: i64,
    pub has_translation_providers: bool,
    pub updated_at: i64,
}

/// The pieces of a raw negotiation payload this store persists.
struct ParsedPayload {
    capabilities: CapabilitySet,
    notification_capabilities: CapabilitySet,
    signaling_version: i64,
    translations_raw: String,
    translations_count: i64,
    has_translation_providers: bool,
}

/// Pull the persisted pieces out of a raw capability payload.
///
/// The payload is the `capabilities` object of the negotiation response:
/// a `spreed` subtree with `features`/`config`/`version`, and optionally a
/// `notifications` subtree. When no `spreed` key exists the whole payload is
/// treated as the talk subtree, which keeps already-unwrapped payloads
/// working. Malformed sub-structures degrade to empty sets, never errors.
fn parse_payload(payload: &Value) -> ParsedPayload {
    let spreed = payload.get("spreed").unwrap_or(payload);

    let capabilities = CapabilitySet::parse(spreed);
    let notification_capabilities = payload
        .get("notifications")
        .map(CapabilitySet::parse)
        .unwrap_or_default();

    let config_chat = spreed.pointer("/config/chat");
    let translations_raw = config_chat
        .and_then(|c| c.get("translations"))
        .filter(|t| t.is_array())
        .map(|t| t.to_string())
        .unwrap_or_else(|| "[]".to_string());
    let translations_count = crate::translations::from_raw_list(&translations_raw).len() as i64;
    let has_translation_providers = config_chat
        .and_then(|c| c.get("has-translation-providers"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let signaling_version = spreed
        .pointer("/config/signaling/version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    ParsedPayload {
        capabilities,
        notification_capabilities,
        signaling_version,
        translations_raw,
        translations_count,
        has_translation_providers,
    }
}

type CapabilityRow = (String, String, String, i64, String, String, i64, bool, i64);

fn capabilities_from_row(row: CapabilityRow) -> ServerCapabilities {
    let (
        account_id,
        caps_json,
        notification_caps_json,
        signaling_version,
        external_signaling_version,
        translations_raw,
        translations_count,
        has_translation_providers,
        updated_at,
    ) = row;
    ServerCapabilities {
        account_id,
        capabilities: CapabilitySet::from_stored(&caps_json),
        notification_capabilities: CapabilitySet::from_stored(&notification_caps_json),
        signaling_version,
        external_signaling_version,
        translations_raw,
        translations_count,
        has_translation_providers,
        updated_at,
    }
}

/// Repository for server-wide capability rows.
pub struct CapabilityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CapabilityRepository<'a> {
    /// Create a new capability repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the account's capability row with a freshly parsed payload.
    ///
    /// Returns the parsed set. The external signaling version is the one
    /// piece not carried by the payload; an existing value survives the
    /// replace because it is negotiated through a separate call.
    pub async fn replace(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> Result<CapabilitySet, DbError> {
        let parsed = parse_payload(payload);
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO server_capabilities
                (account_id, caps_json, notification_caps_json, signaling_version,
                 translations_json, translations_count, has_translation_providers,
                 updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (account_id) DO UPDATE SET
                caps_json = excluded.caps_json,
                notification_caps_json = excluded.notification_caps_json,
                signaling_version = excluded.signaling_version,
                translations_json = excluded.translations_json,
                translations_count = excluded.translations_count,
                has_translation_providers = excluded.has_translation_providers,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account_id)
        .bind(parsed.capabilities.to_json().to_string())
        .bind(parsed.notification_capabilities.to_json().to_string())
        .bind(parsed.signaling_version)
        .bind(&parsed.translations_raw)
        .bind(parsed.translations_count)
        .bind(parsed.has_translation_providers)
        .bind(now)
        .execute(self.pool)
        .await?;

        tracing::debug!(
            account_id = %account_id,
            flags = parsed.capabilities.len(),
            "Server capabilities replaced"
        );

        Ok(parsed.capabilities)
    }

    /// The capability row for an account, absent if it never negotiated.
    pub async fn for_account(
        &self,
        account_id: &str,
    ) -> Result<Option<ServerCapabilities>, DbError> {
        let row = sqlx::query_as::<_, CapabilityRow>(
            r#"
            SELECT account_id, caps_json, notification_caps_json, signaling_version,
                   external_signaling_version, translations_json, translations_count,
                   has_translation_providers, updated_at
            FROM server_capabilities
            WHERE account_id = ?
            "#,
        )
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(capabilities_from_row))
    }

    /// Record the version reported by the external signaling server.
    pub async fn set_external_signaling_version(
        &self,
        account_id: &str,
        version: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE server_capabilities SET external_signaling_version = ? WHERE account_id = ?",
        )
        .bind(version)
        .bind(account_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_spreed_subtree() {
        let payload = json!({
            "spreed": {
                "features": ["reactions", "chat-read-marker"],
                "version": "18.0.2",
                "config": {
                    "signaling": { "version": 3 },
                    "chat": {
                        "translations": [{"from": "en", "to": "de"}],
                        "has-translation-providers": true
                    }
                }
            },
            "notifications": { "features": ["exists"] }
        });

        let parsed = parse_payload(&payload);
        assert!(parsed.capabilities.has("reactions"));
        assert!(parsed.notification_capabilities.has("exists"));
        assert_eq!(parsed.signaling_version, 3);
        assert!(parsed.has_translation_providers);
        assert!(parsed.translations_raw.contains("\"en\""));
        assert_eq!(parsed.translations_count, 1);
    }

    #[test]
    fn malformed_translation_entries_do_not_count() {
        let payload = json!({
            "config": {
                "chat": { "translations": [{"language": "en"}, 7] }
            }
        });
        let parsed = parse_payload(&payload);
        assert_ne!(parsed.translations_raw, "[]");
        assert_eq!(parsed.translations_count, 0);
    }

    #[test]
    fn unwrapped_payload_is_the_talk_subtree() {
        let payload = json!({ "features": ["talk-polls"] });
        let parsed = parse_payload(&payload);
        assert!(parsed.capabilities.has("talk-polls"));
        assert!(parsed.notification_capabilities.is_empty());
        assert_eq!(parsed.translations_raw, "[]");
    }
}

//! Capability sets negotiated with Talk servers.
//!
//! A [`CapabilitySet`] is the queryable form of a raw capability payload: a
//! flat map from flag identifier to either plain presence or a version
//! string. Parsing is total; sub-structures that do not look like capability
//! data are skipped rather than failing the negotiation.

pub mod flags;
mod version;

pub use version::{compare_versions, meets_minimum};

use serde_json::Value;
use std::collections::BTreeMap;

/// Value carried by a single capability flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityValue {
    /// Boolean-equivalent presence flag.
    Enabled,
    /// Flag that encodes a version string instead of plain presence.
    Version(String),
}

/// A parsed, queryable set of capability flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    flags: BTreeMap<String, CapabilityValue>,
}

impl CapabilitySet {
    /// Build a set from a raw payload.
    ///
    /// Recognized shapes:
    /// - an array of strings: each string becomes a presence flag
    /// - an object: `key: true` becomes a presence flag, `key: "1.2"` and
    ///   `key: 7` become versioned flags, nested objects and arrays recurse
    ///
    /// `false`, `null`, and anything else is skipped.
    pub fn parse(payload: &Value) -> Self {
        let mut set = Self::default();
        set.collect(payload);
        set
    }

    fn collect(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(flag) if !flag.is_empty() => {
                            self.flags.insert(flag.clone(), CapabilityValue::Enabled);
                        }
                        Value::Object(_) | Value::Array(_) => self.collect(item),
                        _ => {}
                    }
                }
            }
            Value::Object(map) => {
                for (key, entry) in map {
                    match entry {
                        Value::Bool(true) => {
                            self.flags.insert(key.clone(), CapabilityValue::Enabled);
                        }
                        Value::String(s) if !s.is_empty() => {
                            self.flags
                                .insert(key.clone(), CapabilityValue::Version(s.clone()));
                        }
                        Value::Number(n) => {
                            self.flags
                                .insert(key.clone(), CapabilityValue::Version(n.to_string()));
                        }
                        Value::Object(_) | Value::Array(_) => self.collect(entry),
                        // false / null / empty string mean "not supported"
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Whether `flag` is present, either as plain presence or versioned.
    pub fn has(&self, flag: &str) -> bool {
        self.flags.contains_key(flag)
    }

    /// The version string carried by `flag`, if it is a versioned flag.
    pub fn version_of(&self, flag: &str) -> Option<&str> {
        match self.flags.get(flag) {
            Some(CapabilityValue::Version(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether `flag` is present with a version of at least `required`.
    ///
    /// A missing flag fails the check, as does a flag that carries no
    /// version payload: without version information the gate fails closed.
    pub fn has_minimum_version(&self, flag: &str, required: &str) -> bool {
        match self.version_of(flag) {
            Some(actual) => meets_minimum(actual, required),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Iterate over flags in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CapabilityValue)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize to the flat JSON object form used for persistence.
    pub fn to_json(&self) -> Value {
        let map = self
            .flags
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    CapabilityValue::Enabled => Value::Bool(true),
                    CapabilityValue::Version(s) => Value::String(s.clone()),
                };
                (k.clone(), value)
            })
            .collect();
        Value::Object(map)
    }

    /// Rebuild a set from its persisted JSON form.
    ///
    /// Falls back to an empty set on malformed text so a corrupted row reads
    /// as "nothing supported" instead of an error.
    pub fn from_stored(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::parse(&value),
            Err(e) => {
                tracing::debug!(error = %e, "Discarding unreadable capability row");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_feature_list() {
        let payload = json!({
            "features": ["chat-read-marker", "reactions", "conversation-v4"]
        });
        let set = CapabilitySet::parse(&payload);
        assert!(set.has("chat-read-marker"));
        assert!(set.has("reactions"));
        assert!(!set.has("edit-messages"));
    }

    #[test]
    fn parses_versioned_flags() {
        let payload = json!({
            "version": "18.0.2",
            "features": ["talk-polls"],
            "config": { "chat": { "max-length": 32000 } }
        });
        let set = CapabilitySet::parse(&payload);
        assert_eq!(set.version_of("version"), Some("18.0.2"));
        assert_eq!(set.version_of("max-length"), Some("32000"));
        assert!(set.has("talk-polls"));
        // presence flags carry no version
        assert_eq!(set.version_of("talk-polls"), None);
    }

    #[test]
    fn minimum_version_fails_for_absent_flag() {
        let set = CapabilitySet::parse(&json!({ "features": ["reactions"] }));
        assert!(!set.has_minimum_version("nonexistent", "1.0"));
        // present but unversioned also fails closed
        assert!(!set.has_minimum_version("reactions", "1.0"));
    }

    #[test]
    fn minimum_version_compares_numerically() {
        let set = CapabilitySet::parse(&json!({ "version": "18.0.2" }));
        assert!(set.has_minimum_version("version", "17.0.0"));
        assert!(set.has_minimum_version("version", "18.0.2"));
        assert!(!set.has_minimum_version("version", "18.1"));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let payload = json!({
            "features": ["reactions", 42, null, ["nested", "list"]],
            "broken": false,
            "empty": ""
        });
        let set = CapabilitySet::parse(&payload);
        assert!(set.has("reactions"));
        assert!(set.has("nested"));
        assert!(!set.has("broken"));
        assert!(!set.has("empty"));
    }

    #[test]
    fn json_round_trip() {
        let set = CapabilitySet::parse(&json!({
            "features": ["reactions"],
            "version": "18.0.2"
        }));
        let restored = CapabilitySet::from_stored(&set.to_json().to_string());
        assert_eq!(set, restored);
    }

    #[test]
    fn unreadable_stored_row_reads_empty() {
        let set = CapabilitySet::from_stored("{ not json");
        assert!(set.is_empty());
    }
}

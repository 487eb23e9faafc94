//! Typed projection of the server-provided translation pair list.

use serde::Deserialize;
use serde_json::Value;

/// One language pair the server can translate between.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Translation {
    pub from: String,
    #[serde(rename = "fromLabel", default)]
    pub from_label: String,
    pub to: String,
    #[serde(rename = "toLabel", default)]
    pub to_label: String,
}

/// Project a raw translation list into typed records.
///
/// Entries missing the `from`/`to` codes are skipped; partial data is
/// preferable to discarding the list.
pub fn from_raw_list(raw: &str) -> Vec<Translation> {
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Translation>(entry) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed translation entry");
                None
            }
        })
        .collect()
}

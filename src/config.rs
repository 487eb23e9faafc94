//! Core configuration.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the account/capability core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Path to the SQLite database, or `":memory:"` for an ephemeral store.
    pub database_path: String,
    /// Buffered change events per subscriber before the oldest are dropped.
    pub event_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: "talk-core.db".to_string(),
            event_capacity: 64,
        }
    }
}

impl CoreConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// An ephemeral in-memory configuration, mainly for tests.
    pub fn in_memory() -> Self {
        Self {
            database_path: ":memory:".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: CoreConfig = toml::from_str("database_path = \"/tmp/talk.db\"").unwrap();
        assert_eq!(config.database_path, "/tmp/talk.db");
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<CoreConfig, _> = toml::from_str("databse_path = \"typo\"");
        assert!(result.is_err());
    }
}

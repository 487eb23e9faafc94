//! talk-core - account and capability state core for a multi-account Talk
//! client.
//!
//! Tracks which servers the user is signed into, keeps each server's (and
//! federated peer's) negotiated capability set coherent, and maintains the
//! per-account counters behind unread badges and pending federation
//! invitations. Network fetching, UI, and login flows live outside this
//! crate; callers hand in already-fetched capability payloads and subscribe
//! to change events.
//!
//! The entry point is [`TalkCore`]:
//!
//! ```no_run
//! use talk_core::{CoreConfig, TalkCore};
//!
//! # async fn example() -> Result<(), talk_core::DbError> {
//! let core = TalkCore::open(&CoreConfig::in_memory()).await?;
//! let account = core.create_account("alice", "https://talk.example").await?;
//! assert!(account.is_active);
//! core.shutdown().await;
//! # Ok(())
//! # }
//! ```

/// Capability sets, flag constants, and version gating.
pub mod caps;
/// Core configuration loading.
pub mod config;
/// The process-wide store facade.
pub mod core;
/// SQLite persistence and repositories.
pub mod db;
/// Change-notification bus.
pub mod events;
/// Translation pair projection.
pub mod translations;

pub use crate::caps::{CapabilitySet, CapabilityValue};
pub use crate::config::{ConfigError, CoreConfig};
pub use crate::core::TalkCore;
pub use crate::db::{
    Account, Database, DbError, FederatedCapabilities, Room, ServerCapabilities, account_id_for,
};
pub use crate::events::{ChangeEvent, EventBus};
pub use crate::translations::Translation;

//! Shared helpers for integration tests.

use serde_json::{Value, json};
use std::sync::Once;
use talk_core::{CoreConfig, TalkCore};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route store tracing through the test harness; `RUST_LOG` overrides the
/// default filter. Safe to call from every test in the binary.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Open a core backed by a fresh in-memory store.
pub async fn open_core() -> TalkCore {
    init_tracing();
    TalkCore::open(&CoreConfig::in_memory())
        .await
        .expect("Failed to open in-memory core")
}

/// A negotiation payload advertising the given feature flags.
#[allow(dead_code)]
pub fn payload_with_features(features: &[&str]) -> Value {
    json!({
        "spreed": {
            "features": features,
            "version": "18.0.2",
            "config": {
                "signaling": { "version": 3 }
            }
        },
        "notifications": { "features": ["exists"] }
    })
}

mod common;

use common::{open_core, payload_with_features};
use serde_json::json;

#[tokio::test]
async fn hit_requires_matching_proxy_hash() {
    let core = open_core().await;
    let alice = core
        .create_account("alice", "https://a.example")
        .await
        .expect("create");

    core.set_federated_capabilities(
        &alice.account_id,
        "https://remote.example",
        "room1",
        &json!({ "features": ["talk-polls", "reactions"] }),
        "hash-1",
    )
    .await
    .expect("put");

    let hit = core
        .federated_capabilities(&alice.account_id, "https://remote.example", "room1", "hash-1")
        .await
        .expect("get")
        .expect("hit");
    assert!(hit.has("talk-polls"));
    assert!(hit.has("reactions"));

    // a rotated hash must read as a miss, never as stale data
    let miss = core
        .federated_capabilities(&alice.account_id, "https://remote.example", "room1", "hash-2")
        .await
        .expect("get");
    assert!(miss.is_none());
}

#[tokio::test]
async fn entries_are_keyed_by_full_triple() {
    let core = open_core().await;
    let alice = core
        .create_account("alice", "https://a.example")
        .await
        .expect("create");

    core.set_federated_capabilities(
        &alice.account_id,
        "https://remote.example",
        "room1",
        &json!({ "features": ["talk-polls"] }),
        "hash-1",
    )
    .await
    .expect("put");

    // same room token on a different remote server is a distinct entry
    let miss = core
        .federated_capabilities(&alice.account_id, "https://other.example", "room1", "hash-1")
        .await
        .expect("get");
    assert!(miss.is_none());
}

#[tokio::test]
async fn put_overwrites_existing_entry() {
    let core = open_core().await;
    let alice = core
        .create_account("alice", "https://a.example")
        .await
        .expect("create");

    core.set_federated_capabilities(
        &alice.account_id,
        "https://remote.example",
        "room1",
        &json!({ "features": ["talk-polls"] }),
        "hash-1",
    )
    .await
    .expect("put");

    // re-negotiated under a new proxy configuration
    core.set_federated_capabilities(
        &alice.account_id,
        "https://remote.example",
        "room1",
        &json!({ "features": ["reactions"] }),
        "hash-2",
    )
    .await
    .expect("overwrite");

    let entry = core
        .federated_capabilities(&alice.account_id, "https://remote.example", "room1", "hash-2")
        .await
        .expect("get")
        .expect("hit");
    assert!(entry.has("reactions"));
    assert!(!entry.has("talk-polls"));
}

#[tokio::test]
async fn room_removal_evicts_cache_entries() {
    let core = open_core().await;
    let alice = core
        .create_account("alice", "https://a.example")
        .await
        .expect("create");

    let room = talk_core::Room {
        account_id: alice.account_id.clone(),
        token: "room1".to_string(),
        remote_server: Some("https://remote.example".to_string()),
        proxy_hash: "hash-1".to_string(),
    };
    core.upsert_room(&room).await.expect("upsert");

    core.set_federated_capabilities(
        &alice.account_id,
        "https://remote.example",
        "room1",
        &json!({ "features": ["talk-polls"] }),
        "hash-1",
    )
    .await
    .expect("put");

    core.remove_room(&alice.account_id, "room1").await.expect("remove");

    assert!(
        core.room_with_token(&alice.account_id, "room1")
            .await
            .expect("query")
            .is_none()
    );
    let miss = core
        .federated_capabilities(&alice.account_id, "https://remote.example", "room1", "hash-1")
        .await
        .expect("get");
    assert!(miss.is_none());
}

#[tokio::test]
async fn account_removal_cascades_capability_data() {
    let core = open_core().await;
    let alice = core
        .create_account("alice", "https://a.example")
        .await
        .expect("create");

    core.set_server_capabilities(&alice.account_id, &payload_with_features(&["reactions"]))
        .await
        .expect("set caps");
    core.set_federated_capabilities(
        &alice.account_id,
        "https://remote.example",
        "room1",
        &json!({ "features": ["talk-polls"] }),
        "hash-1",
    )
    .await
    .expect("put");

    core.remove_account(&alice.account_id).await.expect("remove");

    assert!(
        core.server_capabilities(&alice.account_id)
            .await
            .expect("query")
            .is_none()
    );
    // the in-memory snapshot was evicted along with the rows
    assert!(
        core.server_capability_set(&alice.account_id)
            .await
            .expect("query")
            .is_none()
    );
    let miss = core
        .federated_capabilities(&alice.account_id, "https://remote.example", "room1", "hash-1")
        .await
        .expect("get");
    assert!(miss.is_none());
}

use crate::core::retry::RetryPolicy;
use crate::queue::api::*;
use crate::storage::api::{KeyValueStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn store() -> (Arc<MemoryStore>, QueueStore) {
    let kv = Arc::new(MemoryStore::new());
    let store = QueueStore::new("background_queue", kv.clone(), RetryPolicy::none());
    (kv, store)
}

#[tokio::test]
async fn test_append_assigns_increasing_sequences() {
    let (_, store) = store();
    let first = store
        .append(&[QueueItem::new("a", vec![]), QueueItem::new("b", vec![])])
        .await
        .unwrap();
    let second = store.append(&[QueueItem::new("c", vec![json!(1)])]).await.unwrap();

    assert_eq!(first, vec![1, 2]);
    assert_eq!(second, vec![3]);
    assert_eq!(store.len().await.unwrap(), 3);
    assert_eq!(store.items_key(), "hookwork/background_queue/items");
}

#[tokio::test]
async fn test_remove_through_keeps_newer_items() {
    let (_, store) = store();
    store
        .append(&[
            QueueItem::new("a", vec![]),
            QueueItem::new("b", vec![]),
            QueueItem::new("c", vec![]),
        ])
        .await
        .unwrap();

    assert_eq!(store.remove_through(2).await.unwrap(), 2);
    let left = store.items().await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].item.action, "c");

    // Sequences keep growing after removals and clears
    store.clear().await.unwrap();
    assert_eq!(store.append(&[QueueItem::new("d", vec![])]).await.unwrap(), vec![4]);
}

#[tokio::test]
async fn test_corrupt_document_is_reported() {
    let (kv, store) = store();
    kv.set("hookwork/background_queue/items", "not json".to_string())
        .await
        .unwrap();
    assert!(matches!(
        store.items().await,
        Err(QueueError::Corrupt { .. })
    ));
}

#[tokio::test]
async fn test_lock_is_single_flight_and_owner_scoped() {
    let (_, store) = store();
    let ttl = Duration::from_secs(60);

    assert!(store.acquire_lock("one", ttl).await.unwrap());
    assert!(!store.acquire_lock("two", ttl).await.unwrap());
    assert!(store.acquire_lock("one", ttl).await.unwrap());

    assert!(!store.release_lock("two").await.unwrap());
    assert_eq!(store.active_lock().await.unwrap().unwrap().owner, "one");

    assert!(store.release_lock("one").await.unwrap());
    assert!(store.active_lock().await.unwrap().is_none());
    assert!(store.acquire_lock("two", ttl).await.unwrap());
}

#[tokio::test]
async fn test_document_format_is_stable_json() {
    let (kv, store) = store();
    store
        .append(&[QueueItem::new("after_save_record/post", vec![json!({"record_id": 9})])])
        .await
        .unwrap();

    let raw = kv
        .get("hookwork/background_queue/items")
        .await
        .unwrap()
        .unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(document["revision"], 1);
    assert_eq!(document["next_sequence"], 1);
    assert_eq!(document["items"][0]["sequence"], 1);
    assert_eq!(document["items"][0]["action"], "after_save_record/post");
    assert_eq!(document["items"][0]["args"][0]["record_id"], 9);
    assert!(document["items"][0]["queued_at"].is_string());
}

use std::collections::HashSet;

use bytes::Bytes;
use chrono::Utc;

use crate::backend::AttachmentBackend;
use crate::error::AttachmentError;
use crate::record::{AttachmentMeta, AttachmentRecord};
use crate::store::AttachmentStore;

fn record(id: &str, payload: &'static [u8], name: &str, content_type: &str) -> AttachmentRecord {
    AttachmentRecord::new(
        id,
        Bytes::from_static(payload),
        AttachmentMeta::new(name, content_type, payload.len() as u64),
        1_700_000_000_000,
    )
}

fn set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| (*id).to_owned()).collect()
}

/// Run the full backend conformance test suite.
///
/// Call this from your backend's test module with a fresh backend. The
/// suite clears the backend between cases, so do not point it at data you
/// care about.
///
/// # Errors
///
/// Returns an error if the backend fails an operation outright.
pub async fn run_backend_conformance_tests(
    backend: &dyn AttachmentBackend,
) -> Result<(), AttachmentError> {
    test_get_missing(backend).await?;
    test_put_and_get(backend).await?;
    test_put_replaces_whole_record(backend).await?;
    test_delete_is_idempotent(backend).await?;
    test_clear(backend).await?;
    test_retain(backend).await?;
    test_retain_empty_set(backend).await?;
    test_ids(backend).await?;
    Ok(())
}

async fn test_get_missing(backend: &dyn AttachmentBackend) -> Result<(), AttachmentError> {
    let found = backend.get("never-written").await?;
    assert!(found.is_none(), "get on missing id should return None");
    Ok(())
}

async fn test_put_and_get(backend: &dyn AttachmentBackend) -> Result<(), AttachmentError> {
    let original = record("put-get", b"\x89PNG\r", "a.png", "image/png");
    backend.put(original.clone()).await?;
    let found = backend.get("put-get").await?;
    assert_eq!(found, Some(original), "get should return the stored record unchanged");
    Ok(())
}

async fn test_put_replaces_whole_record(
    backend: &dyn AttachmentBackend,
) -> Result<(), AttachmentError> {
    backend
        .put(record("overwrite", b"first payload", "first.png", "image/png"))
        .await?;
    let replacement = record("overwrite", b"2nd", "second.jpg", "image/jpeg");
    backend.put(replacement.clone()).await?;

    let found = backend.get("overwrite").await?;
    assert_eq!(found, Some(replacement), "put should replace, not merge");
    Ok(())
}

async fn test_delete_is_idempotent(backend: &dyn AttachmentBackend) -> Result<(), AttachmentError> {
    backend
        .put(record("to-delete", b"bye", "bye.gif", "image/gif"))
        .await?;
    assert!(backend.delete("to-delete").await?, "delete should report an existing record");
    assert!(backend.get("to-delete").await?.is_none(), "get after delete should return None");
    assert!(
        !backend.delete("to-delete").await?,
        "delete on missing id should report nothing removed"
    );
    Ok(())
}

async fn test_clear(backend: &dyn AttachmentBackend) -> Result<(), AttachmentError> {
    backend.clear().await?;
    for id in ["clear-a", "clear-b", "clear-c"] {
        backend.put(record(id, b"data", "x.png", "image/png")).await?;
    }

    let removed = backend.clear().await?;
    assert_eq!(removed, 3);
    for id in ["clear-a", "clear-b", "clear-c"] {
        assert!(backend.get(id).await?.is_none(), "{id} should be gone after clear");
    }
    Ok(())
}

async fn test_retain(backend: &dyn AttachmentBackend) -> Result<(), AttachmentError> {
    backend.clear().await?;
    for id in ["A", "B", "C"] {
        backend.put(record(id, b"data", "x.png", "image/png")).await?;
    }

    let removed = backend.retain(&set(&["A", "B"])).await?;
    assert_eq!(removed, 1, "only C should be removed");
    assert!(backend.get("A").await?.is_some());
    assert!(backend.get("B").await?.is_some());
    assert!(backend.get("C").await?.is_none());
    Ok(())
}

async fn test_retain_empty_set(backend: &dyn AttachmentBackend) -> Result<(), AttachmentError> {
    backend.clear().await?;
    backend.put(record("orphan", b"data", "x.png", "image/png")).await?;

    // Ids in the valid set that are not stored are simply ignored.
    let removed = backend.retain(&set(&["not-stored"])).await?;
    assert_eq!(removed, 1);
    assert!(backend.ids().await?.is_empty());

    let removed = backend.retain(&HashSet::new()).await?;
    assert_eq!(removed, 0, "retain on an empty backend removes nothing");
    Ok(())
}

async fn test_ids(backend: &dyn AttachmentBackend) -> Result<(), AttachmentError> {
    backend.clear().await?;
    for id in ["id-1", "id-2"] {
        backend.put(record(id, b"data", "x.png", "image/png")).await?;
    }

    let mut ids = backend.ids().await?;
    ids.sort();
    assert_eq!(ids, vec!["id-1".to_owned(), "id-2".to_owned()]);
    backend.clear().await?;
    Ok(())
}

/// Run the store-level conformance suite against an available store.
///
/// Exercises the facade end to end, including `created_at` stamping. The
/// suite clears the store before it starts.
pub async fn run_store_conformance_tests(store: &AttachmentStore) {
    assert!(store.is_available().await, "store under test must be available");
    store.clear().await;

    test_store_put_stamps_created_at(store).await;
    test_store_overwrite(store).await;
    test_store_delete_and_clear(store).await;
    test_store_reconcile(store).await;
}

async fn test_store_put_stamps_created_at(store: &AttachmentStore) {
    let before = Utc::now().timestamp_millis();
    let stored = store
        .put(
            "att-1",
            Bytes::from_static(b"\x89PNG\r"),
            AttachmentMeta::new("a.png", "image/png", 5),
        )
        .await;
    let after = Utc::now().timestamp_millis();
    assert_eq!(stored.as_deref(), Some("att-1"), "put should return the id");

    let found = store.get("att-1").await.expect("att-1 should be stored");
    assert_eq!(found.id, "att-1");
    assert_eq!(found.name, "a.png");
    assert_eq!(found.content_type, "image/png");
    assert_eq!(found.size, 5);
    assert_eq!(found.blob.as_ref(), b"\x89PNG\r");
    assert!(
        (before..=after).contains(&found.created_at),
        "created_at should be stamped at put time"
    );

    let removed = store.reconcile(&HashSet::new()).await;
    assert_eq!(removed, 1);
    assert!(store.get("att-1").await.is_none(), "reconcile with no valid ids empties the store");
}

async fn test_store_overwrite(store: &AttachmentStore) {
    store
        .put(
            "same-id",
            Bytes::from_static(b"first"),
            AttachmentMeta::new("first.png", "image/png", 5),
        )
        .await;
    store
        .put(
            "same-id",
            Bytes::from_static(b"second!"),
            AttachmentMeta::new("second.webp", "image/webp", 7),
        )
        .await;

    let found = store.get("same-id").await.expect("same-id should be stored");
    assert_eq!(found.name, "second.webp");
    assert_eq!(found.content_type, "image/webp");
    assert_eq!(found.size, 7);
    assert_eq!(found.blob.as_ref(), b"second!");
    store.delete("same-id").await;
}

async fn test_store_delete_and_clear(store: &AttachmentStore) {
    store
        .put("gone", Bytes::from_static(b"x"), AttachmentMeta::new("x.png", "image/png", 1))
        .await;
    store.delete("gone").await;
    store.delete("gone").await;
    assert!(store.get("gone").await.is_none());

    for id in ["c-1", "c-2"] {
        store
            .put(id, Bytes::from_static(b"x"), AttachmentMeta::new("x.png", "image/png", 1))
            .await;
    }
    store.clear().await;
    assert!(store.get("c-1").await.is_none());
    assert!(store.get("c-2").await.is_none());
}

async fn test_store_reconcile(store: &AttachmentStore) {
    for id in ["A", "B", "C"] {
        store
            .put(id, Bytes::from_static(b"x"), AttachmentMeta::new("x.png", "image/png", 1))
            .await;
    }

    let removed = store.reconcile(&set(&["A", "B"])).await;
    assert_eq!(removed, 1);
    assert!(store.get("A").await.is_some());
    assert!(store.get("B").await.is_some());
    assert!(store.get("C").await.is_none());
    store.clear().await;
}

use std::collections::HashSet;
use std::sync::Arc;

use ai_kit_attachments::{AttachmentMeta, AttachmentStore};
use ai_kit_chatbot::history::prune_and_reconcile;
use ai_kit_chatbot::{ChatHistory, ChatMessage, ChatbotConfig, Role, create_attachment_store};
use bytes::Bytes;

fn sqlite_config(dir: &std::path::Path) -> ChatbotConfig {
    format!(
        "[attachments]\nbackend = \"sqlite\"\ndata_dir = {:?}\n",
        dir.display().to_string()
    )
    .parse()
    .expect("config should parse")
}

#[tokio::test]
async fn attach_load_and_forget_an_image() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(dir.path());
    let store = create_attachment_store(&config.attachments).unwrap();

    let stored = store
        .put(
            "att-1",
            Bytes::from_static(&[1, 2, 3, 4, 5]),
            AttachmentMeta::new("a.png", "image/png", 5),
        )
        .await;
    assert_eq!(stored.as_deref(), Some("att-1"));

    let record = store.get("att-1").await.expect("att-1 should load");
    assert_eq!(record.id, "att-1");
    assert_eq!(record.name, "a.png");
    assert_eq!(record.content_type, "image/png");
    assert_eq!(record.size, 5);
    assert_eq!(record.blob.as_ref(), &[1u8, 2, 3, 4, 5]);
    assert!(record.created_at > 0);

    assert_eq!(store.reconcile(&HashSet::new()).await, 1);
    assert!(store.get("att-1").await.is_none());
}

#[tokio::test]
async fn attachments_survive_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(dir.path());

    {
        let first = create_attachment_store(&config.attachments).unwrap();
        first
            .put("att-keep", Bytes::from_static(b"png"), AttachmentMeta::new("k.png", "image/png", 3))
            .await
            .expect("write should persist");
    }

    let second = create_attachment_store(&config.attachments).unwrap();
    let record = second.get("att-keep").await.expect("record should persist");
    assert_eq!(record.blob.as_ref(), b"png");
}

#[tokio::test]
async fn pruning_history_garbage_collects_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let store = create_attachment_store(&sqlite_config(dir.path()).attachments).unwrap();

    let mut history = ChatHistory::new();
    for (id, at, attachment) in [("m1", 1_000, "att-old"), ("m2", 2_000, "att-new")] {
        store
            .put(attachment, Bytes::from_static(b"img"), AttachmentMeta::new("x.png", "image/png", 3))
            .await;
        history.push(ChatMessage {
            id: id.to_owned(),
            role: Role::User,
            content: String::new(),
            attachment_ids: vec![attachment.to_owned()],
            created_at: at,
        });
    }

    let removed = prune_and_reconcile(&store, &mut history, 1_500).await;
    assert_eq!(removed, 1);
    assert!(store.get("att-old").await.is_none());
    assert!(store.get("att-new").await.is_some());
}

#[tokio::test]
async fn clearing_chat_data_removes_everything() {
    let store = Arc::new(AttachmentStore::new(ai_kit_attachments_memory::MemoryOpener::new()));
    for id in ["a", "b", "c"] {
        store
            .put(id, Bytes::from_static(b"x"), AttachmentMeta::new("x.png", "image/png", 1))
            .await;
    }

    store.clear().await;
    for id in ["a", "b", "c"] {
        assert!(store.get(id).await.is_none());
    }
}

#[tokio::test]
async fn disabled_store_never_persists() {
    let config: ChatbotConfig = "[attachments]\nbackend = \"disabled\"\n".parse().unwrap();
    let store = create_attachment_store(&config.attachments).unwrap();

    let stored = store
        .put("att-1", Bytes::from_static(b"x"), AttachmentMeta::new("x.png", "image/png", 1))
        .await;
    assert!(stored.is_none());
    assert!(store.get("att-1").await.is_none());
    store.delete("att-1").await;
    store.clear().await;
    assert_eq!(store.reconcile(&HashSet::from(["att-1".to_owned()])).await, 0);
}

//! Chat history as far as attachment cleanup is concerned.
//!
//! The store never decides which attachments are still needed. The chat
//! side owns the history, so it computes the set of attachment ids that
//! retained messages still reference and hands it to
//! [`AttachmentStore::reconcile`].

use std::collections::HashSet;

use ai_kit_attachments::AttachmentStore;
use serde::{Deserialize, Serialize};

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Ids of attachments stored alongside this message.
    #[serde(default)]
    pub attachment_ids: Vec<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// The messages of one conversation, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Every attachment id referenced by a retained message.
    pub fn referenced_attachment_ids(&self) -> HashSet<String> {
        self.messages
            .iter()
            .flat_map(|m| m.attachment_ids.iter().cloned())
            .collect()
    }

    /// Drop messages created before `cutoff_ms`. Returns how many were dropped.
    pub fn prune_before(&mut self, cutoff_ms: i64) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| m.created_at >= cutoff_ms);
        before - self.messages.len()
    }
}

/// Union of the attachment ids referenced across several conversations.
pub fn referenced_ids<'a>(histories: impl IntoIterator<Item = &'a ChatHistory>) -> HashSet<String> {
    histories
        .into_iter()
        .flat_map(ChatHistory::referenced_attachment_ids)
        .collect()
}

/// Prune `history` to messages newer than `cutoff_ms`, then drop every stored
/// attachment the retained messages no longer reference.
///
/// Only suitable when `history` is the sole conversation sharing `store`;
/// with several conversations, prune each and reconcile with
/// [`referenced_ids`] over all of them. Returns the number of attachments
/// removed.
pub async fn prune_and_reconcile(
    store: &AttachmentStore,
    history: &mut ChatHistory,
    cutoff_ms: i64,
) -> u64 {
    let pruned = history.prune_before(cutoff_ms);
    let removed = store.reconcile(&history.referenced_attachment_ids()).await;
    tracing::debug!(pruned, removed, "pruned chat history");
    removed
}

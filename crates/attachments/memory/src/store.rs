use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use ai_kit_attachments::backend::{AttachmentBackend, BackendOpener};
use ai_kit_attachments::error::AttachmentError;
use ai_kit_attachments::record::AttachmentRecord;

/// A stored record tagged with the sequence number of the write that produced it.
#[derive(Debug, Clone)]
struct Entry {
    record: AttachmentRecord,
    seq: u64,
}

/// In-memory [`AttachmentBackend`] backed by a [`DashMap`].
///
/// Nothing survives the process. Suitable for development, tests, and
/// hosts that want attachments cached for a single session only.
#[derive(Debug, Default)]
pub struct MemoryAttachmentBackend {
    data: DashMap<String, Entry>,
    next_seq: AtomicU64,
}

impl MemoryAttachmentBackend {
    /// Create a new, empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids outside `valid_ids`, paired with the write sequence seen now.
    fn snapshot_unreferenced(&self, valid_ids: &HashSet<String>) -> Vec<(String, u64)> {
        self.data
            .iter()
            .filter(|entry| !valid_ids.contains(entry.key()))
            .map(|entry| (entry.key().clone(), entry.seq))
            .collect()
    }

    /// Remove each snapshotted entry unless it was rewritten after the snapshot.
    fn remove_unchanged(&self, doomed: Vec<(String, u64)>) -> u64 {
        let mut removed = 0;
        for (id, seq) in doomed {
            if self.data.remove_if(&id, |_, entry| entry.seq == seq).is_some() {
                removed += 1;
            }
        }
        removed
    }
}

#[async_trait]
impl AttachmentBackend for MemoryAttachmentBackend {
    async fn put(&self, record: AttachmentRecord) -> Result<(), AttachmentError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.data.insert(record.id.clone(), Entry { record, seq });
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<AttachmentRecord>, AttachmentError> {
        Ok(self.data.get(id).map(|entry| entry.record.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, AttachmentError> {
        Ok(self.data.remove(id).is_some())
    }

    async fn clear(&self) -> Result<u64, AttachmentError> {
        let mut removed = 0;
        self.data.retain(|_, _| {
            removed += 1;
            false
        });
        Ok(removed)
    }

    async fn retain(&self, valid_ids: &HashSet<String>) -> Result<u64, AttachmentError> {
        let doomed = self.snapshot_unreferenced(valid_ids);
        Ok(self.remove_unchanged(doomed))
    }

    async fn ids(&self) -> Result<Vec<String>, AttachmentError> {
        Ok(self.data.iter().map(|entry| entry.key().clone()).collect())
    }
}

/// [`BackendOpener`] that always succeeds with an in-memory backend.
///
/// Every `open` returns the same backend, so records are shared by all
/// stores built from one opener.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    backend: Arc<MemoryAttachmentBackend>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackendOpener for MemoryOpener {
    async fn open(&self) -> Result<Arc<dyn AttachmentBackend>, AttachmentError> {
        Ok(Arc::clone(&self.backend) as Arc<dyn AttachmentBackend>)
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

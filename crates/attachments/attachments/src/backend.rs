use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AttachmentError;
use crate::record::AttachmentRecord;

/// Storage engine behind an [`AttachmentStore`](crate::AttachmentStore).
///
/// Every method runs as one atomic transaction. Nothing is guaranteed
/// across calls: a `retain` running alongside a `put` may or may not see
/// the new record.
#[async_trait]
pub trait AttachmentBackend: Send + Sync {
    /// Insert a record, replacing any existing record with the same id.
    async fn put(&self, record: AttachmentRecord) -> Result<(), AttachmentError>;

    /// Fetch a record by id. Returns `None` if absent.
    async fn get(&self, id: &str) -> Result<Option<AttachmentRecord>, AttachmentError>;

    /// Delete a record by id. Returns `true` if it existed.
    async fn delete(&self, id: &str) -> Result<bool, AttachmentError>;

    /// Remove every record. Returns the number removed.
    async fn clear(&self) -> Result<u64, AttachmentError>;

    /// Remove every record whose id is not in `valid_ids`.
    ///
    /// The key set is read and pruned inside a single transaction, so the
    /// decision reflects the state at transaction start. Returns the number
    /// of records removed.
    async fn retain(&self, valid_ids: &HashSet<String>) -> Result<u64, AttachmentError>;

    /// List stored ids in no particular order.
    async fn ids(&self) -> Result<Vec<String>, AttachmentError>;
}

/// Opens a backend on first use.
///
/// Return [`AttachmentError::Unsupported`] when the environment has no
/// persistent storage at all; any other error is treated as a failed open.
#[async_trait]
pub trait BackendOpener: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn AttachmentBackend>, AttachmentError>;

    /// Short human-readable description used in log lines.
    fn describe(&self) -> String;
}

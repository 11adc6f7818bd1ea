use thiserror::Error;

/// Errors raised by attachment backends.
///
/// These never reach users of [`AttachmentStore`](crate::AttachmentStore);
/// the store logs them and answers with an empty result instead.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The environment has no persistent local storage.
    #[error("persistent storage unsupported: {0}")]
    Unsupported(String),

    /// The database could not be opened.
    #[error("failed to open attachment database: {0}")]
    Open(String),

    /// The on-disk schema is newer than this build understands.
    #[error("attachment database blocked: schema version {found} is newer than supported version {supported}")]
    Blocked {
        /// Version found in the database.
        found: i64,
        /// Highest version this build can open.
        supported: i64,
    },

    /// A single transaction failed or was aborted.
    #[error("attachment transaction failed: {0}")]
    Transaction(String),

    /// A stored row could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AttachmentError {
    /// Returns `true` when the error means storage is simply not available
    /// here, as opposed to something having gone wrong.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Caller-supplied metadata for an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    /// Original file name.
    pub name: String,
    /// MIME type (e.g. `"image/png"`).
    #[serde(rename = "type")]
    pub content_type: String,
    /// Original byte length.
    pub size: u64,
}

impl AttachmentMeta {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size,
        }
    }
}

/// A stored attachment: id, metadata, payload and creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    /// Caller-generated identifier, unique within the store.
    pub id: String,
    /// Original file name.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// Original byte length as reported by the caller.
    pub size: u64,
    /// The raw payload.
    pub blob: Bytes,
    /// Creation time in epoch milliseconds. Informational only; nothing expires on it.
    pub created_at: i64,
}

impl AttachmentRecord {
    /// Assemble a record from its parts.
    pub fn new(id: impl Into<String>, blob: Bytes, meta: AttachmentMeta, created_at: i64) -> Self {
        Self {
            id: id.into(),
            name: meta.name,
            content_type: meta.content_type,
            size: meta.size,
            blob,
            created_at,
        }
    }

    /// The metadata portion of the record, without the payload.
    pub fn meta(&self) -> AttachmentMeta {
        AttachmentMeta {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            size: self.size,
        }
    }
}

use ai_kit_attachments::AttachmentStore;
use ai_kit_attachments_memory::MemoryOpener;
use ai_kit_attachments_sqlite::SqliteOpener;

use crate::config::AttachmentsConfig;
use crate::error::ChatbotError;

/// Create an attachment store from the given configuration.
///
/// Nothing is opened here; the backend is opened on the store's first use,
/// so a missing data directory or an unreadable database only degrades the
/// store rather than failing startup. The only error is an unknown backend.
pub fn create_attachment_store(config: &AttachmentsConfig) -> Result<AttachmentStore, ChatbotError> {
    let store = match config.backend.as_str() {
        "sqlite" => AttachmentStore::new(SqliteOpener::new(config.sqlite_config())),
        "memory" => AttachmentStore::new(MemoryOpener::new()),
        "disabled" => AttachmentStore::unavailable(),
        other => {
            return Err(ChatbotError::Config(format!(
                "unknown attachments backend: {other}"
            )));
        }
    };

    tracing::debug!(backend = %config.backend, "created attachment store");
    Ok(store)
}

//! Process-wide attachment store.
//!
//! The chat UI shares one store per process. Install it once at startup
//! with [`install`]; code that runs without an installed store (tests, a
//! non-interactive context) gets an unavailable store from [`global`] and
//! all of its operations become no-ops.

use std::sync::OnceLock;

use crate::store::AttachmentStore;

static GLOBAL: OnceLock<AttachmentStore> = OnceLock::new();

/// Install the process-wide store.
///
/// Returns the installed store, or gives `store` back if a store was
/// already installed or [`global`] already fell back to the unavailable one.
pub fn install(store: AttachmentStore) -> Result<&'static AttachmentStore, AttachmentStore> {
    let mut pending = Some(store);
    let installed = GLOBAL.get_or_init(|| pending.take().unwrap_or_else(AttachmentStore::unavailable));
    match pending {
        None => Ok(installed),
        Some(rejected) => Err(rejected),
    }
}

/// The process-wide store, or a cached unavailable store if none was installed.
pub fn global() -> &'static AttachmentStore {
    GLOBAL.get_or_init(AttachmentStore::unavailable)
}

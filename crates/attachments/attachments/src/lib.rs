//! Local persistence for chatbot message attachments.
//!
//! [`AttachmentStore`] is the entry point callers use. It opens its backend
//! lazily through a [`BackendOpener`] and degrades to a no-op store when the
//! environment has no persistent storage, so none of its operations fail.

pub mod backend;
pub mod error;
pub mod global;
pub mod record;
pub mod store;
pub mod testing;

pub use backend::{AttachmentBackend, BackendOpener};
pub use error::AttachmentError;
pub use record::{AttachmentMeta, AttachmentRecord};
pub use store::AttachmentStore;

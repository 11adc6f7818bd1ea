mod store;

pub use store::{MemoryAttachmentBackend, MemoryOpener};

pub mod config;
pub mod migrations;
pub mod store;

pub use config::SqliteConfig;
pub use store::{SqliteAttachmentBackend, SqliteOpener};

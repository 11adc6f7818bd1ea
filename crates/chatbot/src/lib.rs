pub mod config;
pub mod error;
pub mod factory;
pub mod history;
pub mod sweeper;
pub mod telemetry;

pub use config::{AttachmentsConfig, ChatbotConfig, LoggingConfig};
pub use error::ChatbotError;
pub use factory::create_attachment_store;
pub use history::{ChatHistory, ChatMessage, Role};
pub use sweeper::{ValidIdSource, spawn_reconcile_task, start_sweeper};

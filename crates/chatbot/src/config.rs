use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ai_kit_attachments_sqlite::SqliteConfig;
use ai_kit_attachments_sqlite::config::DEFAULT_DATABASE_NAME;
use serde::Deserialize;

use crate::error::ChatbotError;

/// Top-level chatbot configuration, loaded from a TOML file.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ChatbotConfig {
    /// Attachment store configuration.
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ChatbotConfig {
    /// Read and parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ChatbotError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        content.parse()
    }
}

impl FromStr for ChatbotConfig {
    type Err = ChatbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// Configuration for the attachment store.
///
/// # Example
///
/// ```toml
/// [attachments]
/// backend = "sqlite"
/// data_dir = "/var/lib/ai-kit"
/// reconcile_interval_seconds = 3600
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsConfig {
    /// Which backend to use: `"sqlite"`, `"memory"`, or `"disabled"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory for the SQLite database. Without it the `sqlite` backend
    /// has nowhere to persist and the store runs degraded.
    pub data_dir: Option<PathBuf>,

    /// Database file stem.
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// SQLite connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Interval for the periodic reconcile sweep. `0` disables it.
    #[serde(default)]
    pub reconcile_interval_seconds: u64,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: None,
            database_name: default_database_name(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            reconcile_interval_seconds: 0,
        }
    }
}

impl AttachmentsConfig {
    /// The SQLite backend settings described by this section.
    pub fn sqlite_config(&self) -> SqliteConfig {
        SqliteConfig {
            data_dir: self.data_dir.clone(),
            database_name: self.database_name.clone(),
            pool_size: self.pool_size,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    /// The periodic sweep interval, or `None` when disabled.
    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_seconds > 0)
            .then(|| Duration::from_secs(self.reconcile_interval_seconds))
    }
}

fn default_backend() -> String {
    "sqlite".to_owned()
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_owned()
}

fn default_pool_size() -> u32 {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Configuration for log output.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive. `RUST_LOG` takes precedence.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_owned()
}

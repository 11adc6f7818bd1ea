use std::path::PathBuf;
use std::time::Duration;

/// Name of the attachment database when none is configured.
pub const DEFAULT_DATABASE_NAME: &str = "ai-kit-chatbot-attachments";

/// Configuration for the SQLite attachment backend.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Directory holding the database file. `None` means the host has no
    /// persistent storage and the backend reports itself unsupported.
    pub data_dir: Option<PathBuf>,

    /// Database file stem; the file is `<data_dir>/<database_name>.sqlite3`.
    pub database_name: String,

    /// Maximum number of connections in the `sqlx` pool.
    pub pool_size: u32,

    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_name: String::from(DEFAULT_DATABASE_NAME),
            pool_size: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl SqliteConfig {
    /// Create a configuration storing the database under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// Set the database file stem.
    #[must_use]
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    /// Set the pool size.
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the busy timeout.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Full path of the database file, if a data directory is configured.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.sqlite3", self.database_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = SqliteConfig::default();
        assert!(cfg.data_dir.is_none());
        assert_eq!(cfg.database_name, "ai-kit-chatbot-attachments");
        assert_eq!(cfg.pool_size, 4);
        assert_eq!(cfg.busy_timeout, Duration::from_secs(5));
        assert!(cfg.database_path().is_none());
    }

    #[test]
    fn database_path() {
        let cfg = SqliteConfig::new("/var/lib/ai-kit");
        assert_eq!(
            cfg.database_path(),
            Some(PathBuf::from("/var/lib/ai-kit/ai-kit-chatbot-attachments.sqlite3"))
        );
    }

    #[test]
    fn custom_database_name() {
        let cfg = SqliteConfig::new("/tmp/profile")
            .with_database_name("attachments")
            .with_pool_size(1);
        assert_eq!(
            cfg.database_path(),
            Some(PathBuf::from("/tmp/profile/attachments.sqlite3"))
        );
        assert_eq!(cfg.pool_size, 1);
    }
}

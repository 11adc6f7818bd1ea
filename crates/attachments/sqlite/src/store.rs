use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use ai_kit_attachments::backend::{AttachmentBackend, BackendOpener};
use ai_kit_attachments::error::AttachmentError;
use ai_kit_attachments::record::AttachmentRecord;

use crate::config::SqliteConfig;
use crate::migrations;

type AttachmentRow = (String, String, String, i64, Vec<u8>, i64);

fn decode_row(row: AttachmentRow) -> Result<AttachmentRecord, AttachmentError> {
    let (id, name, content_type, size, blob, created_at) = row;
    let size = u64::try_from(size).map_err(|_| {
        AttachmentError::Serialization(format!("negative size {size} for attachment {id}"))
    })?;

    Ok(AttachmentRecord {
        id,
        name,
        content_type,
        size,
        blob: Bytes::from(blob),
        created_at,
    })
}

#[allow(clippy::needless_pass_by_value)]
fn tx_error(e: sqlx::Error) -> AttachmentError {
    AttachmentError::Transaction(e.to_string())
}

/// SQLite-backed implementation of [`AttachmentBackend`].
///
/// One database file per profile, holding a single `attachments` table
/// keyed by id. Every operation is a single statement, so each one commits
/// or fails atomically on its own.
#[derive(Debug, Clone)]
pub struct SqliteAttachmentBackend {
    pool: SqlitePool,
}

impl SqliteAttachmentBackend {
    /// Open (creating if needed) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Unsupported`] when no data directory is
    /// configured, [`AttachmentError::Blocked`] when the file was written by
    /// a newer schema, and [`AttachmentError::Open`] for anything else.
    pub async fn open(config: &SqliteConfig) -> Result<Self, AttachmentError> {
        let Some(path) = config.database_path() else {
            return Err(AttachmentError::Unsupported(
                "no data directory configured".to_owned(),
            ));
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AttachmentError::Open(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .connect_with(options)
            .await
            .map_err(|e| AttachmentError::Open(format!("{}: {e}", path.display())))?;

        if let Err(e) = migrations::run_migrations(&pool).await {
            pool.close().await;
            return Err(e);
        }

        tracing::debug!(path = %path.display(), "opened attachment database");
        Ok(Self { pool })
    }

    /// Wrap an existing pool. Runs migrations on creation.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, AttachmentError> {
        migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Close the underlying pool, waiting for connections to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AttachmentBackend for SqliteAttachmentBackend {
    async fn put(&self, record: AttachmentRecord) -> Result<(), AttachmentError> {
        let size = i64::try_from(record.size).map_err(|_| {
            AttachmentError::Serialization(format!("size {} does not fit in a row", record.size))
        })?;

        sqlx::query(
            "INSERT INTO attachments (id, name, content_type, size, blob, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT (id) DO UPDATE \
             SET name = excluded.name, \
                 content_type = excluded.content_type, \
                 size = excluded.size, \
                 blob = excluded.blob, \
                 created_at = excluded.created_at",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.content_type)
        .bind(size)
        .bind(record.blob.as_ref())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(tx_error)?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<AttachmentRecord>, AttachmentError> {
        let row: Option<AttachmentRow> = sqlx::query_as(
            "SELECT id, name, content_type, size, blob, created_at \
             FROM attachments WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(tx_error)?;

        row.map(decode_row).transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool, AttachmentError> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(tx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<u64, AttachmentError> {
        let result = sqlx::query("DELETE FROM attachments")
            .execute(&self.pool)
            .await
            .map_err(tx_error)?;

        Ok(result.rows_affected())
    }

    async fn retain(&self, valid_ids: &HashSet<String>) -> Result<u64, AttachmentError> {
        // One statement: the key scan and the deletes share a single snapshot.
        let valid = serde_json::to_string(valid_ids)
            .map_err(|e| AttachmentError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            "DELETE FROM attachments \
             WHERE id NOT IN (SELECT value FROM json_each(?1))",
        )
        .bind(valid)
        .execute(&self.pool)
        .await
        .map_err(tx_error)?;

        Ok(result.rows_affected())
    }

    async fn ids(&self) -> Result<Vec<String>, AttachmentError> {
        sqlx::query_scalar::<_, String>("SELECT id FROM attachments")
            .fetch_all(&self.pool)
            .await
            .map_err(tx_error)
    }
}

/// [`BackendOpener`] for the SQLite backend.
#[derive(Debug, Clone)]
pub struct SqliteOpener {
    config: SqliteConfig,
}

impl SqliteOpener {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendOpener for SqliteOpener {
    async fn open(&self) -> Result<Arc<dyn AttachmentBackend>, AttachmentError> {
        let backend = SqliteAttachmentBackend::open(&self.config).await?;
        Ok(Arc::new(backend))
    }

    fn describe(&self) -> String {
        match self.config.database_path() {
            Some(path) => format!("sqlite ({})", path.display()),
            None => "sqlite (no data directory)".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ai_kit_attachments::AttachmentStore;
    use ai_kit_attachments::record::AttachmentMeta;
    use ai_kit_attachments::testing::{run_backend_conformance_tests, run_store_conformance_tests};

    use super::*;

    fn png(id: &str, payload: &'static [u8]) -> AttachmentRecord {
        AttachmentRecord::new(
            id,
            Bytes::from_static(payload),
            AttachmentMeta::new("a.png", "image/png", payload.len() as u64),
            1_700_000_000_000,
        )
    }

    #[tokio::test]
    async fn conformance() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteAttachmentBackend::open(&SqliteConfig::new(dir.path()))
            .await
            .unwrap();
        run_backend_conformance_tests(&backend)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn store_conformance() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(SqliteOpener::new(SqliteConfig::new(dir.path())));
        run_store_conformance_tests(&store).await;
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::new(dir.path());

        let backend = SqliteAttachmentBackend::open(&config).await.unwrap();
        backend.put(png("att-1", b"hello")).await.unwrap();
        backend.close().await;

        let reopened = SqliteAttachmentBackend::open(&config).await.unwrap();
        let found = reopened.get("att-1").await.unwrap();
        assert_eq!(found, Some(png("att-1", b"hello")));
    }

    #[tokio::test]
    async fn missing_data_dir_is_unsupported() {
        let err = SqliteAttachmentBackend::open(&SqliteConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_unsupported(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn unusable_data_dir_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("occupied");
        std::fs::write(&not_a_dir, b"file, not a directory").unwrap();

        let err = SqliteAttachmentBackend::open(&SqliteConfig::new(&not_a_dir))
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Open(_)), "unexpected error: {err}");

        let store = AttachmentStore::new(SqliteOpener::new(SqliteConfig::new(&not_a_dir)));
        assert!(!store.is_available().await);
    }

    #[tokio::test]
    async fn newer_schema_blocks_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::new(dir.path());
        let path = config.database_path().unwrap();

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query("PRAGMA user_version = 2")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let err = SqliteAttachmentBackend::open(&config).await.unwrap_err();
        assert!(
            matches!(err, AttachmentError::Blocked { found: 2, supported: 1 }),
            "unexpected error: {err}"
        );

        let store = AttachmentStore::new(SqliteOpener::new(config));
        assert!(!store.is_available().await);
        assert!(
            store
                .put("att-1", Bytes::from_static(b"x"), AttachmentMeta::new("x.png", "image/png", 1))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::new(dir.path());

        let backend = SqliteAttachmentBackend::open(&config).await.unwrap();
        backend.put(png("kept", b"data")).await.unwrap();
        let version = migrations::schema_version(&backend.pool).await.unwrap();
        assert_eq!(version, migrations::SCHEMA_VERSION);

        let again = SqliteAttachmentBackend::from_pool(backend.pool.clone())
            .await
            .unwrap();
        assert!(again.get("kept").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn describe_names_the_file() {
        let opener = SqliteOpener::new(SqliteConfig::new("/data/profile"));
        assert_eq!(
            opener.describe(),
            "sqlite (/data/profile/ai-kit-chatbot-attachments.sqlite3)"
        );
        assert_eq!(
            SqliteOpener::new(SqliteConfig::default()).describe(),
            "sqlite (no data directory)"
        );
    }
}

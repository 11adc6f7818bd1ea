use sqlx::SqlitePool;

use ai_kit_attachments::error::AttachmentError;

/// Schema version written to `PRAGMA user_version` by this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Bring the database schema up to [`SCHEMA_VERSION`].
///
/// A fresh database (version 0) gets the `attachments` table. A database
/// already at the current version is left alone. A database stamped with a
/// newer version belongs to a newer release and is refused with
/// [`AttachmentError::Blocked`].
///
/// # Errors
///
/// Returns [`AttachmentError::Blocked`] for a newer schema, or
/// [`AttachmentError::Open`] if any statement fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AttachmentError> {
    let found = schema_version(pool).await?;

    if found > SCHEMA_VERSION {
        return Err(AttachmentError::Blocked {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let mut tx = pool.begin().await.map_err(open_error)?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS attachments (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            blob BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )",
    )
    .execute(&mut *tx)
    .await
    .map_err(open_error)?;

    // PRAGMA does not accept bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
        .execute(&mut *tx)
        .await
        .map_err(open_error)?;

    tx.commit().await.map_err(open_error)?;

    tracing::debug!(from = found, to = SCHEMA_VERSION, "migrated attachment database");
    Ok(())
}

/// Read `PRAGMA user_version`.
pub async fn schema_version(pool: &SqlitePool) -> Result<i64, AttachmentError> {
    sqlx::query_scalar::<_, i64>("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(open_error)
}

#[allow(clippy::needless_pass_by_value)]
fn open_error(e: sqlx::Error) -> AttachmentError {
    AttachmentError::Open(e.to_string())
}

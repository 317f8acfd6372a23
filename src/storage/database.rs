//! `SQLite` database connection and lifecycle.
//!
//! The database is stored at `~/.notes-sync/notes-sync.db` and contains
//! tables for the offline queue and the completed log.
//!
//! Every statement runs on the single background thread owned by
//! `tokio_rusqlite::Connection`, so each call is atomic with respect to the
//! others. Do not open a second connection for writes.

use std::path::Path;
use std::sync::Arc;

use tokio_rusqlite::Connection;
use tracing::debug;

use crate::config::Paths;
use crate::error::NotesError;

use super::migrations;

/// Shared handle to the notes-sync database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
}

impl Database {
    /// Open the database at the default location.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::StorageUnavailable` if the database cannot be
    /// opened or migrated.
    pub async fn open() -> Result<Self, NotesError> {
        let paths = Paths::new()?;
        paths
            .ensure_dirs()
            .map_err(|e| NotesError::StorageUnavailable(e.to_string()))?;
        Self::open_at(&paths.database).await
    }

    /// Open the database at a specific path.
    ///
    /// Creates the file, enables WAL, and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::StorageUnavailable` if the database cannot be
    /// opened or migrated.
    pub async fn open_at(path: &Path) -> Result<Self, NotesError> {
        let conn = Connection::open(path).await.map_err(|e| {
            NotesError::StorageUnavailable(format!(
                "Failed to open database {}: {e}",
                path.display()
            ))
        })?;

        conn.call(|conn| -> rusqlite::Result<()> {
            // journal_mode returns the resulting mode as a row
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
            conn.execute_batch("PRAGMA busy_timeout = 5000;")
        })
        .await
        .map_err(|e| NotesError::StorageUnavailable(format!("Failed to configure database: {e}")))?;

        let db = Self {
            conn: Arc::new(conn),
        };
        db.migrate().await?;

        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns `NotesError::StorageUnavailable` if the database cannot be
    /// opened or migrated.
    pub async fn open_in_memory() -> Result<Self, NotesError> {
        let conn = Connection::open_in_memory().await.map_err(|e| {
            NotesError::StorageUnavailable(format!("Failed to open in-memory database: {e}"))
        })?;

        let db = Self {
            conn: Arc::new(conn),
        };
        db.migrate().await?;

        Ok(db)
    }

    async fn migrate(&self) -> Result<(), NotesError> {
        self.conn
            .call(|conn| -> rusqlite::Result<()> { migrations::run(conn) })
            .await
            .map_err(|e| NotesError::StorageUnavailable(format!("Migration failed: {e}")))
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub async fn schema_version(&self) -> Result<i32, NotesError> {
        self.conn
            .call(|conn| -> rusqlite::Result<i32> { migrations::get_version(conn) })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to get schema version: {e}")))
    }

    /// Get a reference to the underlying connection.
    ///
    /// Used by the queue and completed log to run their statements.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

//! Append-only log of notes confirmed delivered.
//!
//! The sync core only appends here. `recent` and `count` exist for the
//! status display.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use super::record::NotePayload;
use crate::error::NotesError;
use crate::storage::Database;

/// A delivered note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedNote {
    pub id: String,
    pub payload: NotePayload,
    pub delivered_at: DateTime<Utc>,
}

/// Local record of delivered notes.
#[derive(Clone)]
pub struct CompletedLog {
    db: Database,
}

impl CompletedLog {
    #[must_use]
    pub const fn with_database(db: Database) -> Self {
        Self { db }
    }

    /// Record a delivered note.
    ///
    /// Appending the same id twice keeps the first entry, so a redelivery
    /// after a crash does not duplicate the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn append(&self, id: &str, payload: &NotePayload) -> Result<(), NotesError> {
        let id = id.to_string();
        let payload = payload.clone();
        let delivered_at = Utc::now().timestamp_millis();

        self.db
            .connection()
            .call(move |conn| -> rusqlite::Result<()> {
                conn.execute(
                    r"INSERT OR IGNORE INTO completed_notes
                      (id, profile_url, note, created_at, delivered_at)
                      VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id,
                        payload.profile_url,
                        payload.note,
                        payload.created_at.timestamp_millis(),
                        delivered_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to record delivered note: {e}")))
    }

    /// Number of delivered notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<usize, NotesError> {
        self.db
            .connection()
            .call(|conn| -> rusqlite::Result<i64> {
                conn.query_row("SELECT COUNT(*) FROM completed_notes", [], |row| row.get(0))
            })
            .await
            .map(|n| usize::try_from(n).unwrap_or_default())
            .map_err(|e| NotesError::Database(format!("Failed to count delivered notes: {e}")))
    }

    /// Most recently captured delivered notes, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<CompletedNote>, NotesError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| -> rusqlite::Result<Vec<CompletedNote>> {
                let mut stmt = conn.prepare(
                    r"SELECT id, profile_url, note, created_at, delivered_at
                      FROM completed_notes
                      ORDER BY created_at DESC
                      LIMIT ?1",
                )?;
                let rows = stmt.query_map([limit], |row| {
                    let created_at: i64 = row.get(3)?;
                    let delivered_at: i64 = row.get(4)?;
                    Ok(CompletedNote {
                        id: row.get(0)?,
                        payload: NotePayload {
                            profile_url: row.get(1)?,
                            note: row.get(2)?,
                            created_at: DateTime::<Utc>::from_timestamp_millis(created_at)
                                .unwrap_or_default(),
                        },
                        delivered_at: DateTime::<Utc>::from_timestamp_millis(delivered_at)
                            .unwrap_or_default(),
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to read delivered notes: {e}")))
    }

    /// Drop the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn clear(&self) -> Result<usize, NotesError> {
        self.db
            .connection()
            .call(|conn| -> rusqlite::Result<usize> { conn.execute("DELETE FROM completed_notes", []) })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to clear delivered notes: {e}")))
    }
}

//! Durable queue of notes awaiting delivery.
//!
//! Every method is a single statement (or a single transaction) on the
//! shared connection, so point-operations on one id never interleave.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use super::record::{NotePayload, QueuedRecord, RecordPatch, RecordStatus};
use crate::error::NotesError;
use crate::storage::Database;

const SELECT_COLUMNS: &str = "SELECT id, profile_url, note, created_at, status, retry_count,
                                     last_retry_at, last_error
                              FROM queued_records";

/// Queue for notes captured while offline (or whose delivery failed).
#[derive(Clone)]
pub struct QueueStore {
    db: Database,
}

impl QueueStore {
    /// Create a queue over an existing database handle.
    #[must_use]
    pub const fn with_database(db: Database) -> Self {
        Self { db }
    }

    /// Queue a payload as a new pending record and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    pub async fn enqueue(&self, payload: NotePayload) -> Result<String, NotesError> {
        let record = QueuedRecord::new(payload);
        self.insert(&record).await?;
        Ok(record.id)
    }

    /// Persist a fully formed record. Fails if the id already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    pub async fn insert(&self, record: &QueuedRecord) -> Result<(), NotesError> {
        let record = record.clone();
        let id = record.id.clone();

        self.db
            .connection()
            .call(move |conn| -> rusqlite::Result<()> {
                conn.execute(
                    r"INSERT INTO queued_records
                      (id, profile_url, note, created_at, status, retry_count, last_retry_at, last_error)
                      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.id,
                        record.payload.profile_url,
                        record.payload.note,
                        record.payload.created_at.timestamp_millis(),
                        record.status.as_str(),
                        record.retry_count,
                        record.last_retry_at.map(|t| t.timestamp_millis()),
                        record.last_error,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| NotesError::StorageUnavailable(format!("Failed to enqueue note: {e}")))?;

        debug!(%id, "record queued");
        Ok(())
    }

    /// Read every queued record, oldest first.
    ///
    /// Each call reads current state; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_all(&self) -> Result<Vec<QueuedRecord>, NotesError> {
        self.db
            .connection()
            .call(|conn| -> rusqlite::Result<Vec<QueuedRecord>> {
                let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC"))?;
                let rows = stmt.query_map([], row_to_record)?;
                rows.collect()
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to list queued notes: {e}")))
    }

    /// Read records with the given status, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_status(
        &self,
        status: RecordStatus,
    ) -> Result<Vec<QueuedRecord>, NotesError> {
        self.db
            .connection()
            .call(move |conn| -> rusqlite::Result<Vec<QueuedRecord>> {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE status = ?1 ORDER BY created_at ASC"
                ))?;
                let rows = stmt.query_map([status.as_str()], row_to_record)?;
                rows.collect()
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to list queued notes: {e}")))
    }

    /// Get a specific record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<QueuedRecord>, NotesError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> rusqlite::Result<Option<QueuedRecord>> {
                conn.query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    [id],
                    row_to_record,
                )
                .optional()
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to get queued note: {e}")))
    }

    /// Merge the given fields into an existing record.
    ///
    /// The merge is a single `UPDATE`, so concurrent writers to the same id
    /// cannot lose each other's fields.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::NotFound` if no record has this id.
    pub async fn update_fields(&self, id: &str, patch: &RecordPatch) -> Result<(), NotesError> {
        let owned_id = id.to_string();
        let patch = patch.clone();

        let changed = self
            .db
            .connection()
            .call(move |conn| -> rusqlite::Result<usize> {
                conn.execute(
                    r"UPDATE queued_records SET
                      status = COALESCE(?1, status),
                      retry_count = COALESCE(?2, retry_count),
                      last_retry_at = COALESCE(?3, last_retry_at),
                      last_error = COALESCE(?4, last_error)
                      WHERE id = ?5",
                    params![
                        patch.status.map(|s| s.as_str()),
                        patch.retry_count,
                        patch.last_retry_at.map(|t| t.timestamp_millis()),
                        patch.last_error,
                        owned_id,
                    ],
                )
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to update queued note: {e}")))?;

        if changed == 0 {
            return Err(NotesError::NotFound(format!("queued note {id}")));
        }
        Ok(())
    }

    /// Mark a record `Failed` and bump its retry count in storage.
    ///
    /// The increment happens in the `UPDATE` itself, so a caller holding an
    /// older copy of the record cannot overwrite a count written since.
    /// Returns the new retry count.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::NotFound` if no record has this id.
    pub async fn record_failure(
        &self,
        id: &str,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<u32, NotesError> {
        let owned_id = id.to_string();
        let error = error.to_string();

        let count = self
            .db
            .connection()
            .call(move |conn| -> rusqlite::Result<Option<u32>> {
                conn.query_row(
                    r"UPDATE queued_records SET
                      status = ?1,
                      retry_count = retry_count + 1,
                      last_retry_at = ?2,
                      last_error = ?3
                      WHERE id = ?4
                      RETURNING retry_count",
                    params![RecordStatus::Failed.as_str(), at.timestamp_millis(), error, owned_id],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to record failed attempt: {e}")))?;

        count.ok_or_else(|| NotesError::NotFound(format!("queued note {id}")))
    }

    /// Move a record to `Syncing` if its current status is one of `from`.
    ///
    /// Returns `false` when the record is gone or already claimed by another
    /// pass; that check-and-set is what keeps two passes from delivering the
    /// same record.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn claim(&self, id: &str, from: &[RecordStatus]) -> Result<bool, NotesError> {
        let id = id.to_string();
        let from: Vec<&'static str> = from.iter().map(RecordStatus::as_str).collect();

        self.db
            .connection()
            .call(move |conn| -> rusqlite::Result<bool> {
                let tx = conn.transaction()?;
                let current: Option<String> = tx
                    .query_row(
                        "SELECT status FROM queued_records WHERE id = ?1",
                        [&id],
                        |row| row.get(0),
                    )
                    .optional()?;

                let claimable = current.is_some_and(|s| from.contains(&s.as_str()));
                if claimable {
                    tx.execute(
                        "UPDATE queued_records SET status = ?1 WHERE id = ?2",
                        params![RecordStatus::Syncing.as_str(), id],
                    )?;
                }
                tx.commit()?;
                Ok(claimable)
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to claim queued note: {e}")))
    }

    /// Delete a record. Deleting a missing id is not an error.
    ///
    /// Returns whether a record was actually removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn remove(&self, id: &str) -> Result<bool, NotesError> {
        let id = id.to_string();
        let rows = self
            .db
            .connection()
            .call(move |conn| -> rusqlite::Result<usize> {
                conn.execute("DELETE FROM queued_records WHERE id = ?1", [id])
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to remove queued note: {e}")))?;

        Ok(rows > 0)
    }

    /// Drop every queued record, whatever its status.
    ///
    /// Irreversible; callers confirm intent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn clear_all(&self) -> Result<usize, NotesError> {
        self.db
            .connection()
            .call(|conn| -> rusqlite::Result<usize> { conn.execute("DELETE FROM queued_records", []) })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to clear queue: {e}")))
    }

    /// Number of queued records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<usize, NotesError> {
        self.db
            .connection()
            .call(|conn| -> rusqlite::Result<i64> {
                conn.query_row("SELECT COUNT(*) FROM queued_records", [], |row| row.get(0))
            })
            .await
            .map(|n| usize::try_from(n).unwrap_or_default())
            .map_err(|e| NotesError::Database(format!("Failed to count queue: {e}")))
    }

    /// Reset records left `Syncing` by an interrupted process back to `Pending`.
    ///
    /// Run once at startup, before any sync pass. Returns the number reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn recover_in_flight(&self) -> Result<usize, NotesError> {
        self.db
            .connection()
            .call(|conn| -> rusqlite::Result<usize> {
                conn.execute(
                    "UPDATE queued_records SET status = 'pending' WHERE status = 'syncing'",
                    [],
                )
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to recover in-flight notes: {e}")))
    }

    /// Get queue statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn stats(&self) -> Result<QueueStats, NotesError> {
        let (pending, syncing, failed, oldest) = self
            .db
            .connection()
            .call(|conn| -> rusqlite::Result<(i64, i64, i64, Option<i64>)> {
                conn.query_row(
                    r"SELECT
                        COALESCE(SUM(status = 'pending'), 0),
                        COALESCE(SUM(status = 'syncing'), 0),
                        COALESCE(SUM(status = 'failed'), 0),
                        MIN(created_at)
                      FROM queued_records",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
            })
            .await
            .map_err(|e| NotesError::Database(format!("Failed to read queue stats: {e}")))?;

        Ok(QueueStats {
            pending: usize::try_from(pending).unwrap_or_default(),
            syncing: usize::try_from(syncing).unwrap_or_default(),
            failed: usize::try_from(failed).unwrap_or_default(),
            oldest_queued: oldest.and_then(DateTime::<Utc>::from_timestamp_millis),
        })
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Records waiting for a first attempt
    pub pending: usize,
    /// Records with an attempt in flight
    pub syncing: usize,
    /// Records whose last attempt failed
    pub failed: usize,
    /// Capture time of the oldest queued record
    pub oldest_queued: Option<DateTime<Utc>>,
}

impl QueueStats {
    /// Total queued records.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.syncing + self.failed
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<QueuedRecord> {
    let status_str: String = row.get(4)?;
    let status = RecordStatus::parse(&status_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let created_at: i64 = row.get(3)?;
    let last_retry_at: Option<i64> = row.get(6)?;

    Ok(QueuedRecord {
        id: row.get(0)?,
        payload: NotePayload {
            profile_url: row.get(1)?,
            note: row.get(2)?,
            created_at: millis_to_datetime(created_at),
        },
        status,
        retry_count: row.get(5)?,
        last_retry_at: last_retry_at.map(millis_to_datetime),
        last_error: row.get(7)?,
    })
}

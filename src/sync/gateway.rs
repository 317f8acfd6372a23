//! Submission gateway: the single entry point for new notes.
//!
//! Online, a note goes straight to the remote store and falls back to the
//! queue on any failure. Offline, it is queued without touching the network.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::completed::CompletedLog;
use super::queue::QueueStore;
use super::record::{NotePayload, QueuedRecord};
use super::remote::{deliver_within, RemoteStore};
use crate::connectivity::ConnectivityMonitor;
use crate::error::NotesError;

/// Where a submitted note ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionResult {
    /// Accepted by the remote store
    Delivered,
    /// Stored locally for a later sync
    Queued,
}

/// A submitted note and its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: String,
    pub result: SubmissionResult,
}

/// Accepts notes and guarantees each is either delivered or queued.
#[derive(Clone)]
pub struct SubmissionGateway {
    queue: QueueStore,
    completed: CompletedLog,
    remote: Arc<dyn RemoteStore>,
    monitor: Arc<ConnectivityMonitor>,
    delivery_timeout: Duration,
}

impl SubmissionGateway {
    #[must_use]
    pub fn new(
        queue: QueueStore,
        completed: CompletedLog,
        remote: Arc<dyn RemoteStore>,
        monitor: Arc<ConnectivityMonitor>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            completed,
            remote,
            monitor,
            delivery_timeout,
        }
    }

    /// Submit a note.
    ///
    /// A failed or timed-out delivery is not an error: the note is queued
    /// and `Queued` is returned. So is a delivery whose completion cannot
    /// be logged, which keeps every note in the queue or the completed log.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Validation` for an invalid payload, or
    /// `NotesError::StorageUnavailable` if the note has to be queued and
    /// the queue cannot be written. In that case nothing was persisted.
    pub async fn submit(&self, payload: NotePayload) -> Result<Submission, NotesError> {
        payload.validate()?;
        let record = QueuedRecord::new(payload);

        if self.monitor.is_online() {
            match deliver_within(
                self.remote.as_ref(),
                &record.id,
                &record.payload,
                self.delivery_timeout,
            )
            .await
            {
                Ok(()) => match self.completed.append(&record.id, &record.payload).await {
                    Ok(()) => {
                        info!(id = %record.id, "note delivered");
                        return Ok(Submission {
                            id: record.id,
                            result: SubmissionResult::Delivered,
                        });
                    },
                    // Queued instead; redelivery reuses the id as its idempotency key.
                    Err(e) => {
                        warn!(id = %record.id, error = %e, "completion not logged, queueing note");
                    },
                },
                Err(e) => {
                    warn!(id = %record.id, error = %e, "delivery failed, queueing note");
                },
            }
        }

        self.queue.insert(&record).await.map_err(|e| match e {
            NotesError::StorageUnavailable(_) => e,
            other => NotesError::StorageUnavailable(other.to_string()),
        })?;
        info!(id = %record.id, "note queued");

        Ok(Submission {
            id: record.id,
            result: SubmissionResult::Queued,
        })
    }
}

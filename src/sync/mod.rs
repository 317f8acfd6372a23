//! Offline-first synchronization of contact notes.
//!
//! Notes enter through the [`SubmissionGateway`], wait in the
//! [`QueueStore`] while the remote store is unreachable, and are drained by
//! the [`SyncEngine`]. Delivered notes land in the [`CompletedLog`].

pub mod completed;
pub mod engine;
pub mod gateway;
pub mod queue;
pub mod record;
pub mod remote;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use tracing::info;

pub use completed::{CompletedLog, CompletedNote};
pub use engine::{
    format_sync_report, AttemptOutcome, AttemptResult, EngineConfig, SyncEngine, SyncReport,
};
pub use gateway::{Submission, SubmissionGateway, SubmissionResult};
pub use queue::{QueueStats, QueueStore};
pub use record::{NotePayload, QueuedRecord, RecordPatch, RecordStatus};
pub use remote::{HttpRemoteStore, RemoteStore};

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::NotesError;
use crate::storage::Database;

/// The wired-up sync subsystem for one process.
pub struct SyncService {
    pub queue: QueueStore,
    pub completed: CompletedLog,
    pub monitor: Arc<ConnectivityMonitor>,
    pub engine: Arc<SyncEngine>,
    pub gateway: SubmissionGateway,
}

impl SyncService {
    /// Wire the subsystem over an open database.
    ///
    /// Records left `syncing` by an interrupted process are released back
    /// to `pending`, and the engine is registered to sync on reconnect.
    ///
    /// # Errors
    ///
    /// Returns an error if in-flight records cannot be recovered.
    pub async fn start(
        db: Database,
        remote: Arc<dyn RemoteStore>,
        monitor: Arc<ConnectivityMonitor>,
        config: &SyncConfig,
    ) -> Result<Self, NotesError> {
        let queue = QueueStore::with_database(db.clone());
        let completed = CompletedLog::with_database(db);

        let recovered = queue.recover_in_flight().await?;
        if recovered > 0 {
            info!(recovered, "released interrupted deliveries");
        }

        let engine = Arc::new(SyncEngine::new(
            queue.clone(),
            completed.clone(),
            Arc::clone(&remote),
            Arc::clone(&monitor),
            EngineConfig::from(config),
        ));
        engine.attach();

        let gateway = SubmissionGateway::new(
            queue.clone(),
            completed.clone(),
            remote,
            Arc::clone(&monitor),
            config.delivery_timeout(),
        );

        Ok(Self {
            queue,
            completed,
            monitor,
            engine,
            gateway,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::StubRemote;
    use std::time::Duration;

    #[tokio::test]
    async fn test_start_recovers_interrupted_records() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = QueueStore::with_database(db.clone());
        let id = queue
            .enqueue(NotePayload::new(
                "https://linkedin.com/in/jane",
                "interrupted mid delivery",
            ))
            .await
            .unwrap();
        assert!(queue.claim(&id, &[RecordStatus::Pending]).await.unwrap());

        let service = SyncService::start(
            db,
            Arc::new(StubRemote::accepting()),
            ConnectivityMonitor::new(Some(true)),
            &SyncConfig::default(),
        )
        .await
        .unwrap();

        let record = service.queue.get(&id).await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_offline_submit_then_reconnect_drains_queue() {
        let db = Database::open_in_memory().await.unwrap();
        let remote = Arc::new(StubRemote::accepting());
        let service = SyncService::start(
            db,
            remote.clone(),
            ConnectivityMonitor::new(Some(false)),
            &SyncConfig::default(),
        )
        .await
        .unwrap();

        let submission = service
            .gateway
            .submit(NotePayload::new(
                "https://linkedin.com/in/jane",
                "captured on the train",
            ))
            .await
            .unwrap();
        assert_eq!(submission.result, SubmissionResult::Queued);
        assert_eq!(remote.calls(), 0);

        service.monitor.set_online(true);
        for _ in 0..100 {
            if service.queue.count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(service.queue.count().await.unwrap(), 0);
        assert_eq!(remote.delivered_keys(), vec![submission.id]);
    }
}

//! Sync engine draining the offline queue into the remote store.
//!
//! A record moves `pending -> syncing -> (removed | failed)` and a failed
//! record goes back through `syncing` on the next pass. The move to
//! `syncing` is a storage-level claim, so overlapping passes never deliver
//! the same record twice.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::completed::CompletedLog;
use super::queue::QueueStore;
use super::record::{QueuedRecord, RecordPatch, RecordStatus};
use super::remote::{deliver_within, RemoteStore};
use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityMonitor, ReconnectHook};
use crate::error::NotesError;

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one delivery attempt
    pub delivery_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for EngineConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            delivery_timeout: config.delivery_timeout(),
        }
    }
}

/// Which records a pass picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    FailedOnly,
}

impl Scope {
    const fn eligible(self) -> &'static [RecordStatus] {
        match self {
            Self::All => &[RecordStatus::Pending, RecordStatus::Failed],
            Self::FailedOnly => &[RecordStatus::Failed],
        }
    }
}

/// What happened to one record during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Delivered and moved to the completed log
    Delivered,
    /// Delivery failed; the record is now `failed`
    Failed { error: String },
    /// Another pass owns the record
    Skipped,
    /// Bookkeeping failed; the record stays queued
    StorageError { error: String },
}

/// Result of processing a single record.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub id: String,
    pub profile_url: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Result of one sync pass.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    /// Records delivered
    pub delivered: usize,
    /// Records whose delivery failed
    pub failed: usize,
    /// Records left to another pass
    pub skipped: usize,
    /// Records whose bookkeeping failed
    pub errors: usize,
    /// Individual results
    pub results: Vec<AttemptResult>,
}

impl SyncReport {
    /// Add a result.
    pub fn add(&mut self, result: AttemptResult) {
        match result.outcome {
            AttemptOutcome::Delivered => self.delivered += 1,
            AttemptOutcome::Failed { .. } => self.failed += 1,
            AttemptOutcome::Skipped => self.skipped += 1,
            AttemptOutcome::StorageError { .. } => self.errors += 1,
        }
        self.results.push(result);
    }

    /// Total records the pass looked at.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.delivered + self.failed + self.skipped + self.errors
    }

    /// Whether every attempted record was delivered.
    #[must_use]
    pub const fn all_delivered(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Drains queued notes into the remote store.
///
/// Cheap to clone; clones share the same queue, log, and monitor.
#[derive(Clone)]
pub struct SyncEngine {
    queue: QueueStore,
    completed: CompletedLog,
    remote: Arc<dyn RemoteStore>,
    monitor: Arc<ConnectivityMonitor>,
    config: EngineConfig,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        queue: QueueStore,
        completed: CompletedLog,
        remote: Arc<dyn RemoteStore>,
        monitor: Arc<ConnectivityMonitor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            queue,
            completed,
            remote,
            monitor,
            config,
        }
    }

    /// Register this engine to run a pass whenever the monitor comes online.
    ///
    /// The monitor keeps only a weak reference; the caller owns the `Arc`.
    pub fn attach(self: &Arc<Self>) {
        let hook: Arc<dyn ReconnectHook> = Arc::clone(self) as Arc<dyn ReconnectHook>;
        self.monitor.set_reconnect_hook(Arc::downgrade(&hook));
    }

    /// Attempt delivery of every `pending` and `failed` record.
    ///
    /// Per-record failures are recorded on the record and reported, never
    /// returned. Records already `syncing` belong to another pass and are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the queue cannot be read.
    pub async fn sync_all(&self) -> Result<SyncReport, NotesError> {
        self.run_pass(Scope::All).await
    }

    /// Attempt delivery of `failed` records only.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Offline` without touching the queue when the
    /// monitor reports offline, or an error if the queue cannot be read.
    pub async fn retry_failed(&self) -> Result<SyncReport, NotesError> {
        if !self.monitor.is_online() {
            warn!("retry requested while offline");
            return Err(NotesError::Offline);
        }
        self.run_pass(Scope::FailedOnly).await
    }

    async fn run_pass(&self, scope: Scope) -> Result<SyncReport, NotesError> {
        let records = self.queue.list_all().await?;
        let eligible = scope.eligible();
        let mut report = SyncReport::default();

        let candidates: Vec<QueuedRecord> = records
            .into_iter()
            .filter(|r| r.status == RecordStatus::Syncing || eligible.contains(&r.status))
            .collect();
        if candidates.is_empty() {
            debug!(?scope, "nothing to sync");
            return Ok(report);
        }

        info!(?scope, count = candidates.len(), "sync pass started");
        for record in candidates {
            let outcome = if record.status == RecordStatus::Syncing {
                AttemptOutcome::Skipped
            } else {
                self.attempt(&record, eligible).await
            };
            report.add(AttemptResult {
                id: record.id,
                profile_url: record.payload.profile_url,
                outcome,
            });
        }
        info!(
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            errors = report.errors,
            "sync pass finished"
        );

        Ok(report)
    }

    async fn attempt(&self, record: &QueuedRecord, eligible: &[RecordStatus]) -> AttemptOutcome {
        match self.queue.claim(&record.id, eligible).await {
            Ok(true) => {},
            Ok(false) => {
                debug!(id = %record.id, "record claimed elsewhere");
                return AttemptOutcome::Skipped;
            },
            Err(e) => {
                warn!(id = %record.id, error = %e, "claim failed");
                return AttemptOutcome::StorageError {
                    error: e.to_string(),
                };
            },
        }

        let delivery = deliver_within(
            self.remote.as_ref(),
            &record.id,
            &record.payload,
            self.config.delivery_timeout,
        )
        .await;

        match delivery {
            Ok(()) => self.complete(record).await,
            Err(e) => self.fail(record, &e.to_string()).await,
        }
    }

    /// Log first, then dequeue: a crash in between leaves the record in both
    /// places, never in neither.
    async fn complete(&self, record: &QueuedRecord) -> AttemptOutcome {
        if let Err(e) = self.completed.append(&record.id, &record.payload).await {
            warn!(id = %record.id, error = %e, "delivered but could not log completion");
            let release = RecordPatch::status(RecordStatus::Pending);
            if let Err(e) = self.queue.update_fields(&record.id, &release).await {
                warn!(id = %record.id, error = %e, "could not release record");
            }
            return AttemptOutcome::StorageError {
                error: e.to_string(),
            };
        }

        match self.queue.remove(&record.id).await {
            Ok(_) => {
                debug!(id = %record.id, "record delivered");
                AttemptOutcome::Delivered
            },
            Err(e) => {
                warn!(id = %record.id, error = %e, "delivered but could not dequeue");
                AttemptOutcome::StorageError {
                    error: e.to_string(),
                }
            },
        }
    }

    async fn fail(&self, record: &QueuedRecord, error: &str) -> AttemptOutcome {
        match self.queue.record_failure(&record.id, Utc::now(), error).await {
            Ok(retry_count) => {
                warn!(id = %record.id, retry_count, %error, "delivery failed");
                AttemptOutcome::Failed {
                    error: error.to_string(),
                }
            },
            Err(e) => {
                warn!(id = %record.id, error = %e, "could not record failed attempt");
                AttemptOutcome::StorageError {
                    error: e.to_string(),
                }
            },
        }
    }
}

impl ReconnectHook for SyncEngine {
    fn on_reconnect(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("back online but no runtime to sync on");
            return;
        };

        let engine = self.clone();
        handle.spawn(async move {
            info!("back online, syncing queued notes");
            if let Err(e) = engine.sync_all().await {
                warn!(error = %e, "automatic sync failed");
            }
        });
    }
}

/// Format a sync report for display.
#[must_use]
pub fn format_sync_report(report: &SyncReport) -> String {
    let mut output = String::new();

    if report.total() == 0 {
        return "Nothing to sync".dimmed().to_string();
    }

    output.push_str(&format!(
        "{} {} delivered, {} failed, {} skipped\n",
        "Sync:".bold(),
        report.delivered.to_string().green(),
        report.failed.to_string().red(),
        report.skipped.to_string().dimmed(),
    ));

    for result in &report.results {
        let line = match &result.outcome {
            AttemptOutcome::Delivered => format!("  {} {}", "✓".green(), result.profile_url),
            AttemptOutcome::Failed { error } => format!(
                "  {} {} - {}",
                "✗".red(),
                result.profile_url,
                error.dimmed()
            ),
            AttemptOutcome::Skipped => {
                format!("  {} {} (in progress)", "○".dimmed(), result.profile_url)
            },
            AttemptOutcome::StorageError { error } => format!(
                "  {} {} - {}",
                "!".yellow(),
                result.profile_url,
                error.dimmed()
            ),
        };
        output.push_str(&line);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::sync::record::NotePayload;
    use crate::sync::testing::StubRemote;

    struct Fixture {
        queue: QueueStore,
        completed: CompletedLog,
        remote: Arc<StubRemote>,
        monitor: Arc<ConnectivityMonitor>,
        engine: SyncEngine,
    }

    async fn fixture(remote: StubRemote, online: bool) -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let queue = QueueStore::with_database(db.clone());
        let completed = CompletedLog::with_database(db);
        let remote = Arc::new(remote);
        let monitor = ConnectivityMonitor::new(Some(online));
        let engine = SyncEngine::new(
            queue.clone(),
            completed.clone(),
            remote.clone(),
            Arc::clone(&monitor),
            EngineConfig {
                delivery_timeout: Duration::from_secs(2),
            },
        );
        Fixture {
            queue,
            completed,
            remote,
            monitor,
            engine,
        }
    }

    fn note(n: usize) -> NotePayload {
        NotePayload::new(
            &format!("https://linkedin.com/in/contact-{n}"),
            &format!("follow up about role #{n}"),
        )
    }

    #[tokio::test]
    async fn test_sync_all_delivers_and_logs() {
        let f = fixture(StubRemote::accepting(), true).await;
        let id = f.queue.enqueue(note(1)).await.unwrap();

        let report = f.engine.sync_all().await.unwrap();

        assert_eq!(report.delivered, 1);
        assert!(report.all_delivered());
        assert_eq!(f.queue.count().await.unwrap(), 0);
        let completed = f.completed.recent(10).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, id);
        assert_eq!(f.remote.delivered_keys(), vec![id]);
    }

    #[tokio::test]
    async fn test_sync_all_empty_queue() {
        let f = fixture(StubRemote::accepting(), true).await;
        let report = f.engine.sync_all().await.unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(f.remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_mixed_outcomes() {
        let f = fixture(StubRemote::accepting().failing_on("#2"), false).await;
        let first = f.queue.enqueue(note(1)).await.unwrap();
        let second = f.queue.enqueue(note(2)).await.unwrap();
        let third = f.queue.enqueue(note(3)).await.unwrap();
        f.monitor.set_online(true);

        let report = f.engine.sync_all().await.unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);

        let remaining = f.queue.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);
        assert_eq!(remaining[0].status, RecordStatus::Failed);
        assert_eq!(remaining[0].retry_count, 1);
        assert!(remaining[0].last_retry_at.is_some());
        assert!(remaining[0].last_error.is_some());

        let mut logged: Vec<String> = f
            .completed
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        logged.sort();
        let mut expected = vec![first, third];
        expected.sort();
        assert_eq!(logged, expected);
    }

    #[tokio::test]
    async fn test_retry_count_increments_per_failure() {
        let f = fixture(StubRemote::rejecting(), true).await;
        let id = f.queue.enqueue(note(1)).await.unwrap();

        for expected in 1..=3 {
            let report = f.engine.sync_all().await.unwrap();
            assert_eq!(report.failed, 1);
            let record = f.queue.get(&id).await.unwrap().unwrap();
            assert_eq!(record.retry_count, expected);
            assert_eq!(record.status, RecordStatus::Failed);
        }
        assert_eq!(f.remote.calls(), 3);
    }

    #[tokio::test]
    async fn test_delivery_timeout_counts_as_failure() {
        let mut f = fixture(StubRemote::accepting().with_delay(Duration::from_millis(300)), true)
            .await;
        f.engine.config.delivery_timeout = Duration::from_millis(50);
        let id = f.queue.enqueue(note(1)).await.unwrap();

        let report = f.engine.sync_all().await.unwrap();
        assert_eq!(report.failed, 1);
        let record = f.queue.get(&id).await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Failed);
        assert!(record.last_error.unwrap().contains("timed out after 50ms"));
    }

    #[tokio::test]
    async fn test_stale_copy_still_counts_every_failure() {
        let f = fixture(StubRemote::rejecting(), true).await;
        let id = f.queue.enqueue(note(1)).await.unwrap();
        f.engine.sync_all().await.unwrap();

        let stale = f.queue.get(&id).await.unwrap().unwrap();
        f.engine.sync_all().await.unwrap();
        assert_eq!(stale.retry_count, 1);

        let outcome = f.engine.attempt(&stale, Scope::All.eligible()).await;
        assert!(matches!(outcome, AttemptOutcome::Failed { .. }));

        let record = f.queue.get(&id).await.unwrap().unwrap();
        assert_eq!(f.remote.calls(), 3);
        assert_eq!(record.retry_count, 3);
    }

    #[tokio::test]
    async fn test_concurrent_passes_deliver_once() {
        let f = fixture(StubRemote::accepting().with_delay(Duration::from_millis(50)), true).await;
        f.queue.enqueue(note(1)).await.unwrap();

        let (a, b) = tokio::join!(f.engine.sync_all(), f.engine.sync_all());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(f.remote.calls(), 1);
        assert_eq!(a.delivered + b.delivered, 1);
        assert_eq!(a.skipped + b.skipped, 1);
        assert_eq!(f.queue.count().await.unwrap(), 0);
        assert_eq!(f.completed.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_syncing_records_are_skipped() {
        let f = fixture(StubRemote::accepting(), true).await;
        let id = f.queue.enqueue(note(1)).await.unwrap();
        assert!(f.queue.claim(&id, &[RecordStatus::Pending]).await.unwrap());

        let report = f.engine.sync_all().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(f.remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_failed_offline_has_no_side_effects() {
        let f = fixture(StubRemote::rejecting(), true).await;
        let id = f.queue.enqueue(note(1)).await.unwrap();
        f.engine.sync_all().await.unwrap();
        let before = f.queue.get(&id).await.unwrap().unwrap();

        f.monitor.set_online(false);
        let err = f.engine.retry_failed().await.unwrap_err();
        assert!(matches!(err, NotesError::Offline));

        let after = f.queue.get(&id).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(f.remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_failed_ignores_pending() {
        let f = fixture(StubRemote::accepting().failing_on("#1"), true).await;
        f.queue.enqueue(note(1)).await.unwrap();
        f.engine.sync_all().await.unwrap();
        f.queue.enqueue(note(2)).await.unwrap();

        let report = f.engine.retry_failed().await.unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(f.queue.list_by_status(RecordStatus::Pending).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_triggers_sync() {
        let f = fixture(StubRemote::accepting(), false).await;
        let engine = Arc::new(f.engine.clone());
        engine.attach();
        f.queue.enqueue(note(1)).await.unwrap();

        f.monitor.set_online(true);

        for _ in 0..100 {
            if f.queue.count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(f.queue.count().await.unwrap(), 0);
        assert_eq!(f.completed.count().await.unwrap(), 1);
    }

    #[test]
    fn test_format_report() {
        let mut report = SyncReport::default();
        assert!(format_sync_report(&report).contains("Nothing to sync"));

        report.add(AttemptResult {
            id: "a".to_string(),
            profile_url: "https://linkedin.com/in/a".to_string(),
            outcome: AttemptOutcome::Delivered,
        });
        report.add(AttemptResult {
            id: "b".to_string(),
            profile_url: "https://linkedin.com/in/b".to_string(),
            outcome: AttemptOutcome::Failed {
                error: "remote store returned 503".to_string(),
            },
        });

        let text = format_sync_report(&report);
        assert!(text.contains("https://linkedin.com/in/a"));
        assert!(text.contains("503"));
        assert_eq!(report.total(), 2);
        assert!(!report.all_delivered());
    }
}

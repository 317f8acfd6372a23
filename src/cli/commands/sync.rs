//! Sync command implementations.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tracing::info;

use crate::cli::args::OutputFormat;
use crate::connectivity::{self, ConnectivityProbe};
use crate::error::NotesError;
use crate::output::to_json;
use crate::sync::{format_sync_report, SyncReport, SyncService};

fn render(report: &SyncReport, format: OutputFormat) -> Result<String, NotesError> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Pretty => Ok(format_sync_report(report)),
    }
}

/// Run one pass over every pending and failed note.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn sync(service: &SyncService, format: OutputFormat) -> Result<String, NotesError> {
    let report = service.engine.sync_all().await?;
    render(&report, format)
}

/// Retry failed notes.
///
/// # Errors
///
/// Returns `NotesError::Offline` when offline, or an error if the queue
/// cannot be read.
pub async fn retry(service: &SyncService, format: OutputFormat) -> Result<String, NotesError> {
    let report = service.engine.retry_failed().await?;
    render(&report, format)
}

/// Probe connectivity until `shutdown` resolves, syncing on every reconnect.
///
/// # Errors
///
/// Returns an error if the initial pass cannot read the queue.
pub async fn watch<S>(
    service: &SyncService,
    probe: ConnectivityProbe,
    interval: Duration,
    shutdown: S,
    format: OutputFormat,
) -> Result<String, NotesError>
where
    S: Future<Output = ()>,
{
    if format == OutputFormat::Pretty {
        eprintln!(
            "{} every {}s, press Ctrl-C to stop",
            "Watching connectivity".bold(),
            interval.as_secs()
        );
    }

    if service.monitor.is_online() {
        let report = service.engine.sync_all().await?;
        if report.total() > 0 {
            println!("{}", render(&report, format)?);
        }
    }

    let announce = format;
    let announcer = service.monitor.subscribe(move |online| {
        if announce == OutputFormat::Pretty {
            let state = if online { "online".green() } else { "offline".yellow() };
            eprintln!("Network is {state}");
        }
    });

    connectivity::watch(Arc::clone(&service.monitor), probe, interval, shutdown).await;
    service.monitor.unsubscribe(announcer);
    info!("watch finished");

    let stats = service.queue.stats().await?;
    match format {
        OutputFormat::Json => to_json(&stats),
        OutputFormat::Pretty => Ok(format!("Stopped with {} notes queued", stats.total())),
    }
}

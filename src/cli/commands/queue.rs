//! Queue inspection and maintenance commands.

use chrono::Utc;
use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::error::NotesError;
use crate::output::{format_age, to_json, truncate};
use crate::sync::{RecordStatus, SyncService};

const RECENT_LIMIT: usize = 5;

/// Show connectivity, queue counts, and recent deliveries.
///
/// # Errors
///
/// Returns an error if the queue or completed log cannot be read.
pub async fn status(service: &SyncService, format: OutputFormat) -> Result<String, NotesError> {
    let online = service.monitor.is_online();
    let stats = service.queue.stats().await?;
    let completed = service.completed.count().await?;

    match format {
        OutputFormat::Json => {
            let data = serde_json::json!({
                "online": online,
                "pending": stats.pending,
                "syncing": stats.syncing,
                "failed": stats.failed,
                "completed": completed,
                "oldest_queued": stats.oldest_queued.map(|t| t.to_rfc3339()),
            });
            to_json(&data)
        },
        OutputFormat::Pretty => {
            let mut lines = Vec::new();

            lines.push("Sync Status".bold().to_string());
            lines.push("─".repeat(40));

            lines.push(format!(
                "  Network:    {}",
                if online { "online".green() } else { "offline".yellow() }
            ));
            lines.push(format!(
                "  Pending:    {} {}",
                stats.pending,
                if stats.pending > 0 {
                    "notes waiting".dimmed()
                } else {
                    "".dimmed()
                }
            ));
            lines.push(format!("  Syncing:    {}", stats.syncing));
            lines.push(format!(
                "  Failed:     {} {}",
                stats.failed,
                if stats.failed > 0 {
                    "notes need a retry".red()
                } else {
                    "".normal()
                }
            ));
            lines.push(format!("  Delivered:  {} {}", completed, "notes".dimmed()));

            if let Some(oldest) = stats.oldest_queued {
                lines.push(format!(
                    "  Oldest:     {}",
                    format_age(oldest, Utc::now()).dimmed()
                ));
            }

            let recent = service.completed.recent(RECENT_LIMIT).await?;
            if !recent.is_empty() {
                lines.push(String::new());
                lines.push("Recently delivered".bold().to_string());
                for note in recent {
                    lines.push(format!(
                        "  {} {} {}",
                        "✓".green(),
                        note.payload.profile_url,
                        format_age(note.delivered_at, Utc::now()).dimmed()
                    ));
                }
            }

            if stats.total() > 0 {
                lines.push(String::new());
                lines.push(
                    "Run 'notes-sync sync' to deliver queued notes"
                        .dimmed()
                        .to_string(),
                );
            }

            Ok(lines.join("\n"))
        },
    }
}

/// List queued records, optionally filtered by status.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn list(
    service: &SyncService,
    status: Option<RecordStatus>,
    format: OutputFormat,
) -> Result<String, NotesError> {
    let records = match status {
        Some(status) => service.queue.list_by_status(status).await?,
        None => service.queue.list_all().await?,
    };

    match format {
        OutputFormat::Json => to_json(&records),
        OutputFormat::Pretty => {
            if records.is_empty() {
                return Ok(match status {
                    Some(status) => format!("No {status} notes in queue."),
                    None => "Queue is empty.".to_string(),
                });
            }

            let mut lines = Vec::new();
            lines.push(format!("Queued Notes ({})", records.len()).bold().to_string());
            lines.push("─".repeat(72));
            lines.push(format!(
                "{:<3} {:<40} {:<17} {}",
                "", "Profile", "Captured", "Retries"
            ));
            lines.push("─".repeat(72));

            for record in &records {
                let marker = match record.status {
                    RecordStatus::Pending => "⏳".to_string(),
                    RecordStatus::Syncing => "▶".cyan().to_string(),
                    RecordStatus::Failed => "✗".red().to_string(),
                };
                lines.push(format!(
                    "{:<3} {:<40} {:<17} {}",
                    marker,
                    truncate(&record.payload.profile_url, 40),
                    record.payload.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    record.retry_count
                ));
                lines.push(format!("    {}", truncate(&record.payload.note, 68).dimmed()));

                if let Some(error) = &record.last_error {
                    lines.push(format!("    {}", truncate(error, 68).red()));
                }
            }

            Ok(lines.join("\n"))
        },
    }
}

/// Remove every queued record, and optionally the delivered log.
///
/// # Errors
///
/// Returns `NotesError::Config` without `--force`, or an error if storage
/// cannot be cleared.
pub async fn clear(
    service: &SyncService,
    force: bool,
    completed: bool,
    format: OutputFormat,
) -> Result<String, NotesError> {
    if !force {
        let queued = service.queue.count().await?;
        return Err(NotesError::Config(format!(
            "This removes {queued} queued notes that have not been delivered. Re-run with --force"
        )));
    }

    let removed = service.queue.clear_all().await?;
    let cleared_log = if completed {
        Some(service.completed.clear().await?)
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let data = serde_json::json!({
                "removed": removed,
                "completed_removed": cleared_log,
            });
            to_json(&data)
        },
        OutputFormat::Pretty => {
            let mut message = format!("Removed {removed} queued notes");
            if let Some(count) = cleared_log {
                message.push_str(&format!(" and {count} delivered entries"));
            }
            Ok(message)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::connectivity::ConnectivityMonitor;
    use crate::storage::Database;
    use crate::sync::testing::StubRemote;
    use crate::sync::NotePayload;
    use std::sync::Arc;

    async fn service(online: bool) -> SyncService {
        SyncService::start(
            Database::open_in_memory().await.unwrap(),
            Arc::new(StubRemote::rejecting()),
            ConnectivityMonitor::new(Some(online)),
            &SyncConfig::default(),
        )
        .await
        .unwrap()
    }

    fn note() -> NotePayload {
        NotePayload::new("https://linkedin.com/in/jane", "follow up next week")
    }

    #[tokio::test]
    async fn test_status_json_counts() {
        let service = service(false).await;
        service.gateway.submit(note()).await.unwrap();

        let out = status(&service, OutputFormat::Json).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["online"], false);
        assert_eq!(value["pending"], 1);
        assert_eq!(value["failed"], 0);
        assert_eq!(value["completed"], 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let service = service(false).await;
        service.gateway.submit(note()).await.unwrap();

        let out = list(&service, Some(RecordStatus::Failed), OutputFormat::Pretty)
            .await
            .unwrap();
        assert!(out.contains("No failed notes"));

        let out = list(&service, Some(RecordStatus::Pending), OutputFormat::Json)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_requires_force() {
        let service = service(false).await;
        service.gateway.submit(note()).await.unwrap();

        let err = clear(&service, false, false, OutputFormat::Pretty)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(service.queue.count().await.unwrap(), 1);

        let out = clear(&service, true, false, OutputFormat::Pretty).await.unwrap();
        assert!(out.contains("Removed 1"));
        assert_eq!(service.queue.count().await.unwrap(), 0);
    }
}

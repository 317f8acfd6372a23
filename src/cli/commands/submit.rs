//! Submit command implementation.

use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::error::NotesError;
use crate::output::to_json;
use crate::sync::{NotePayload, SubmissionResult, SyncService};

/// Submit a note through the gateway.
///
/// # Errors
///
/// Returns an error if the note is invalid or cannot be queued.
pub async fn submit(
    service: &SyncService,
    profile: &str,
    note: &str,
    format: OutputFormat,
) -> Result<String, NotesError> {
    let payload = NotePayload::new(profile, note);
    let name = payload.display_name();
    let submission = service.gateway.submit(payload).await?;

    match format {
        OutputFormat::Json => to_json(&submission),
        OutputFormat::Pretty => Ok(match submission.result {
            SubmissionResult::Delivered => {
                format!("{} Note about {} delivered", "✓".green(), name.bold())
            },
            SubmissionResult::Queued => format!(
                "{} Note about {} queued {}",
                "○".yellow(),
                name.bold(),
                "(will sync when online)".dimmed()
            ),
        }),
    }
}

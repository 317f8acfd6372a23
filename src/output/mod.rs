//! Output helpers shared by the commands.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::NotesError;

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `NotesError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, NotesError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Relative age of a timestamp, e.g. "3 hours ago".
#[must_use]
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(at);
    if age.num_days() > 0 {
        format!("{} days ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with "...".
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

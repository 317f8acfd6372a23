//! Record types for the offline queue.
//!
//! Defines the note payload captured by the user, the lifecycle status of a
//! queued record, and the partial update applied by the sync engine.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NotesError;

/// Minimum length of a note after trimming.
pub const MIN_NOTE_LEN: usize = 10;

static PROFILE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(www\.)?linkedin\.com/(in|pub)/[a-zA-Z0-9\-_%]+/?.*$")
        .unwrap_or_else(|e| panic!("Invalid profile URL regex: {e}"))
});

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Generate a record id of the form `{prefix}-{unix_ms}-{suffix}`.
///
/// The millisecond timestamp keeps ids roughly ordered; the random base36
/// suffix separates ids minted within the same millisecond.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("{prefix}-{}-{suffix}", Utc::now().timestamp_millis())
}

/// A note about a contact, as captured by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePayload {
    /// Profile reference the note is about.
    pub profile_url: String,
    /// Free-text note.
    pub note: String,
    /// When the note was captured.
    pub created_at: DateTime<Utc>,
}

impl NotePayload {
    /// Create a payload stamped with the current time. Input is trimmed.
    #[must_use]
    pub fn new(profile_url: &str, note: &str) -> Self {
        Self {
            profile_url: profile_url.trim().to_string(),
            note: note.trim().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Check the payload is something the remote store will accept.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), NotesError> {
        let url = self.profile_url.trim();
        if url.is_empty() {
            return Err(NotesError::Validation("profile URL is required".to_string()));
        }
        if !PROFILE_URL.is_match(url) {
            return Err(NotesError::Validation(format!(
                "'{url}' is not a profile URL (e.g. https://linkedin.com/in/username)"
            )));
        }

        let note = self.note.trim();
        if note.is_empty() {
            return Err(NotesError::Validation("note text is required".to_string()));
        }
        if note.chars().count() < MIN_NOTE_LEN {
            return Err(NotesError::Validation(format!(
                "note must be at least {MIN_NOTE_LEN} characters long"
            )));
        }
        Ok(())
    }

    /// Last path segment of the profile URL with dashes as spaces.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.profile_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .replace('-', " ")
    }
}

/// Lifecycle status of a queued record.
///
/// Delivered records are deleted rather than given a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Waiting for its first delivery attempt
    Pending,
    /// A delivery attempt is in flight
    Syncing,
    /// The last delivery attempt failed
    Failed,
}

impl RecordStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Failed => "failed",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Parse` for an unknown status string.
    pub fn parse(s: &str) -> Result<Self, NotesError> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "failed" => Ok(Self::Failed),
            other => Err(NotesError::Parse(format!("unknown record status '{other}'"))),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRecord {
    /// Unique id, never reused
    pub id: String,
    /// The captured note
    pub payload: NotePayload,
    /// Current lifecycle status
    pub status: RecordStatus,
    /// Number of failed delivery attempts
    pub retry_count: u32,
    /// When the last failed attempt happened
    pub last_retry_at: Option<DateTime<Utc>>,
    /// Error from the last failed attempt
    pub last_error: Option<String>,
}

impl QueuedRecord {
    /// Wrap a payload as a fresh pending record with a new id.
    #[must_use]
    pub fn new(payload: NotePayload) -> Self {
        Self {
            id: generate_id("pending"),
            payload,
            status: RecordStatus::Pending,
            retry_count: 0,
            last_retry_at: None,
            last_error: None,
        }
    }
}

/// Fields to merge into an existing record. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub status: Option<RecordStatus>,
    pub retry_count: Option<u32>,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl RecordPatch {
    /// Patch setting only the status.
    #[must_use]
    pub fn status(status: RecordStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch recording a failed delivery attempt.
    #[must_use]
    pub fn failure(retry_count: u32, at: DateTime<Utc>, error: &str) -> Self {
        Self {
            status: Some(RecordStatus::Failed),
            retry_count: Some(retry_count),
            last_retry_at: Some(at),
            last_error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(url: &str, note: &str) -> NotePayload {
        NotePayload::new(url, note)
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id("pending");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "pending");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_id_unique() {
        let ids: std::collections::HashSet<String> =
            (0..500).map(|_| generate_id("pending")).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_validate_accepts_profile() {
        let p = payload(
            "https://www.linkedin.com/in/jane-doe/",
            "Talked about Rust tooling at the meetup",
        );
        assert!(p.validate().is_ok());
        assert!(payload("http://linkedin.com/pub/x_y%20", "long enough note").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let err = payload("https://example.com/in/jane", "a perfectly fine note")
            .validate()
            .unwrap_err();
        assert!(matches!(err, NotesError::Validation(_)));

        let err = payload("   ", "a perfectly fine note").validate().unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_validate_rejects_short_note() {
        let err = payload("https://linkedin.com/in/jane", "  too short ")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("at least 10"));
    }

    #[test]
    fn test_new_trims_input() {
        let p = payload("  https://linkedin.com/in/jane  ", "  hello there friend  ");
        assert_eq!(p.profile_url, "https://linkedin.com/in/jane");
        assert_eq!(p.note, "hello there friend");
    }

    #[test]
    fn test_display_name() {
        let p = payload("https://linkedin.com/in/jane-doe/", "note text here");
        assert_eq!(p.display_name(), "jane doe");
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [RecordStatus::Pending, RecordStatus::Syncing, RecordStatus::Failed] {
            assert_eq!(RecordStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(RecordStatus::parse("completed").is_err());
    }

    #[test]
    fn test_new_record_defaults() {
        let record = QueuedRecord::new(payload("https://linkedin.com/in/a", "note text here"));
        assert!(record.id.starts_with("pending-"));
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.retry_count, 0);
        assert!(record.last_retry_at.is_none());
    }

    #[test]
    fn test_failure_patch() {
        let now = Utc::now();
        let patch = RecordPatch::failure(2, now, "connection refused");
        assert_eq!(patch.status, Some(RecordStatus::Failed));
        assert_eq!(patch.retry_count, Some(2));
        assert_eq!(patch.last_retry_at, Some(now));
        assert_eq!(patch.last_error.as_deref(), Some("connection refused"));

        let patch = RecordPatch::status(RecordStatus::Syncing);
        assert_eq!(patch.status, Some(RecordStatus::Syncing));
        assert!(patch.retry_count.is_none());
    }
}

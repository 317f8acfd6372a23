//! Error types for notes-sync.

use thiserror::Error;

/// Errors produced by the queue, sync engine, and CLI.
#[derive(Debug, Error)]
pub enum NotesError {
    /// The durable queue could not be opened or initialized.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A statement against an open database failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A queued record referenced by id does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Delivery to the remote store failed (network, status, timeout).
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// An explicit retry was requested while offline.
    #[error("Cannot retry sync while offline")]
    Offline,

    /// A submitted note was rejected before reaching the queue.
    #[error("Invalid note: {0}")]
    Validation(String),

    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization or parsing failed.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotesError {
    /// Whether a later attempt may succeed without user intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DeliveryFailed(_) | Self::StorageUnavailable(_) | Self::Offline
        )
    }
}

impl From<serde_json::Error> for NotesError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for NotesError {
    fn from(e: reqwest::Error) -> Self {
        Self::DeliveryFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(NotesError::DeliveryFailed("timeout".to_string()).is_retryable());
        assert!(NotesError::Offline.is_retryable());
        assert!(!NotesError::Validation("short".to_string()).is_retryable());
        assert!(!NotesError::NotFound("pending-1".to_string()).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            NotesError::Offline.to_string(),
            "Cannot retry sync while offline"
        );
        assert_eq!(
            NotesError::NotFound("pending-1".to_string()).to_string(),
            "Not found: pending-1"
        );
    }
}

//! Path resolution for notes-sync configuration and data files.
//!
//! All data is stored in `~/.notes-sync/` unless `NOTES_SYNC_HOME` points
//! elsewhere:
//! - `config.yaml` - Main configuration file
//! - `notes-sync.db` - SQLite database holding the queue and completed log

use std::path::PathBuf;

use crate::error::NotesError;

/// Environment variable overriding the data root.
pub const HOME_ENV: &str = "NOTES_SYNC_HOME";

/// Paths to notes-sync configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.notes-sync/`
    pub root: PathBuf,
    /// Config file: `~/.notes-sync/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.notes-sync/notes-sync.db`
    pub database: PathBuf,
}

impl Paths {
    /// Resolve paths from `NOTES_SYNC_HOME`, falling back to the user's home
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self, NotesError> {
        if let Ok(root) = std::env::var(HOME_ENV) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let home = std::env::var("HOME").map_err(|_| {
            NotesError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".notes-sync")))
    }

    /// Create paths with a custom root directory (useful for testing).
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("notes-sync.db"),
            root,
        }
    }

    /// Ensure the root directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), NotesError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                NotesError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }
        Ok(())
    }
}

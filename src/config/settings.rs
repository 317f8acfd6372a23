//! Configuration settings for notes-sync.
//!
//! Settings are loaded from `~/.notes-sync/config.yaml`. Every field has a
//! default, so a partial file only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::NotesError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Remote store settings.
    pub remote: RemoteConfig,
    /// Connectivity detection settings.
    pub connectivity: ConnectivityConfig,
    /// Sync engine settings.
    pub sync: SyncConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
}

/// Where and how finalized notes are delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Endpoint notes are POSTed to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Optional URL probed to detect connectivity.
    #[serde(default)]
    pub health_url: Option<String>,
    /// Optional bearer token sent with every delivery.
    #[serde(default)]
    pub api_key: Option<String>,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// How the initial connectivity signal is obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityMode {
    /// Probe `remote.health_url` when configured, otherwise assume online.
    #[default]
    Auto,
    /// Always start online.
    Online,
    /// Always start offline.
    Offline,
}

/// Connectivity detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Initial signal source.
    #[serde(default)]
    pub mode: ConnectivityMode,
    /// Seconds between probes in `watch` mode.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

/// Sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on a single delivery attempt, in seconds.
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,
}

const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

fn default_endpoint() -> String {
    "http://localhost:8080/api/notes".to_string()
}

const fn default_request_timeout() -> u64 {
    15
}

const fn default_probe_interval() -> u64 {
    10
}

const fn default_delivery_timeout() -> u64 {
    30
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            health_url: None,
            api_key: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            mode: ConnectivityMode::Auto,
            probe_interval_secs: default_probe_interval(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: default_delivery_timeout(),
        }
    }
}

impl RemoteConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ConnectivityConfig {
    /// Probe interval as a [`Duration`], never shorter than one second.
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }
}

impl SyncConfig {
    /// Delivery timeout as a [`Duration`].
    #[must_use]
    pub const fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, NotesError> {
        let paths = Paths::new()?;
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, NotesError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            NotesError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            NotesError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), NotesError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| NotesError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            NotesError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Reject settings that would make delivery impossible.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<(), NotesError> {
        if !self.remote.endpoint.starts_with("http://")
            && !self.remote.endpoint.starts_with("https://")
        {
            return Err(NotesError::Config(format!(
                "remote.endpoint must be an http(s) URL, got '{}'",
                self.remote.endpoint
            )));
        }
        if self.remote.timeout_secs == 0 {
            return Err(NotesError::Config(
                "remote.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.sync.delivery_timeout_secs == 0 {
            return Err(NotesError::Config(
                "sync.delivery_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

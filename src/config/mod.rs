//! Configuration management for notes-sync.
//!
//! This module handles loading and saving configuration from `~/.notes-sync/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{
    Config, ConnectivityConfig, ConnectivityMode, GeneralConfig, RemoteConfig, SyncConfig,
};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::sync::RecordStatus;

#[derive(Parser)]
#[command(name = "notes-sync")]
#[command(about = "Capture contact notes offline and sync them when the network is back")]
#[command(long_about = "notes-sync - offline-first note capture

Notes are delivered to the remote store immediately when it is reachable,
and queued locally when it is not. Queued notes are synced on demand or
automatically once connectivity returns.

QUICK START:
  notes-sync submit --profile https://linkedin.com/in/jane --note \"Met at RustConf\"
  notes-sync status         Show queue counts and connectivity
  notes-sync sync           Deliver everything queued
  notes-sync watch          Stay running and sync on reconnect

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

Data lives in ~/.notes-sync (override with NOTES_SYNC_HOME).")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Skip the connectivity probe and report offline for this run
    ///
    /// New notes are queued without a delivery attempt and `retry` is
    /// refused. `sync` still attempts delivery; failures are recorded on
    /// each note.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a note about a contact
    ///
    /// Delivers the note right away when online. If the remote store is
    /// unreachable or rejects it, the note is queued and the command still
    /// succeeds.
    ///
    /// # Examples
    ///
    ///   notes-sync submit --profile https://linkedin.com/in/jane --note "Asked about the role"
    ///   notes-sync --offline submit -p https://linkedin.com/in/jane -n "Captured on the train"
    #[command(alias = "s")]
    Submit {
        /// Profile URL the note is about
        #[arg(short, long)]
        profile: String,

        /// Note text (at least 10 characters)
        #[arg(short, long)]
        note: String,
    },

    /// Show connectivity and queue status
    Status,

    /// List queued notes
    ///
    /// # Examples
    ///
    ///   notes-sync list
    ///   notes-sync list --status failed
    #[command(alias = "ls")]
    List {
        /// Only show records with this status
        #[arg(long, short = 's', value_enum)]
        status: Option<StatusFilter>,
    },

    /// Deliver every pending and failed note
    Sync,

    /// Retry failed notes (requires connectivity)
    Retry,

    /// Remove all queued notes
    ///
    /// Queued notes that were never delivered are lost.
    Clear {
        /// Confirm removal
        #[arg(long)]
        force: bool,

        /// Also clear the delivered-notes log
        #[arg(long)]
        completed: bool,
    },

    /// Watch connectivity and sync automatically on reconnect
    ///
    /// Probes `remote.health_url` every `connectivity.probe_interval_secs`
    /// until interrupted with Ctrl-C.
    Watch,
}

/// Record status accepted by `list --status`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Syncing,
    Failed,
}

impl From<StatusFilter> for RecordStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Syncing => Self::Syncing,
            StatusFilter::Failed => Self::Failed,
        }
    }
}

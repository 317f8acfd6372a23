//! notes-sync - offline-first capture and sync of contact notes
//!
//! Notes are delivered to a remote store when it is reachable and held in a
//! durable local queue when it is not. The sync engine drains the queue on
//! demand and whenever connectivity returns.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod logging;
pub mod output;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::NotesError;
pub use sync::{NotePayload, SubmissionGateway, SubmissionResult, SyncEngine, SyncService};

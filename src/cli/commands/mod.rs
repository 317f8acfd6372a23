//! Command implementations for notes-sync.
//!
//! Each command returns the text to print, already formatted for the
//! requested output format.

mod queue;
mod submit;
mod sync;

pub use queue::{clear, list, status};
pub use submit::submit;
pub use sync::{retry, sync, watch};

//! Logging setup for the command-line binary.
//!
//! Events go to stderr so command output on stdout stays parseable.
//! `RUST_LOG` takes precedence over the `-v` count.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count.
#[must_use]
pub const fn directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "notes_sync=warn",
        1 => "notes_sync=info",
        2 => "notes_sync=debug",
        _ => "notes_sync=trace",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

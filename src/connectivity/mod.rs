//! Connectivity detection.
//!
//! - `monitor`: the process-wide online/offline status and its subscribers
//! - `probe`: reachability checks that feed the monitor

pub mod monitor;
pub mod probe;

pub use monitor::{ConnectivityHandler, ConnectivityMonitor, ReconnectHook, SubscriptionId};
pub use probe::{initial_signal, watch, ConnectivityProbe};

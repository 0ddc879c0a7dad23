//! Daemon subsystem: refresh loop, signal handling, and output sinks.

#[cfg(feature = "daemon")]
pub mod loop_main;
#[cfg(feature = "daemon")]
pub mod signals;
pub mod sink;

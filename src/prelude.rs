//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use status_line_helper::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SlhError};
pub use crate::core::table::{ArgRecord, StatusTable, TableHandle};

// Collectors
pub use crate::collectors::{Collector, CollectorKind, CollectorRegistry, CollectorSet};

// Platform
pub use crate::platform::pal::{Platform, detect_platform};

// Rendering
pub use crate::render::line::{RenderedLine, render};

// Daemon
#[cfg(feature = "daemon")]
pub use crate::daemon::loop_main::{DaemonArgs, StatusDaemon};
pub use crate::daemon::sink::{MemorySink, StatusSink, WriteSink};

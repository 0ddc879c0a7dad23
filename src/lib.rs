#![forbid(unsafe_code)]

//! Status Line Helper (slh): builds one line of system status text per
//! refresh interval for a status bar to display.
//!
//! The line is described by a [`core::table::StatusTable`]: an ordered list of
//! records, each naming a collector (CPU load, memory use, WiFi SSID, local
//! time), a printf-style template with one `%s` slot, and an optional
//! argument. A collector with no value yields the table's placeholder text
//! instead.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use status_line_helper::prelude::*;
//!
//! let platform = detect_platform()?;
//! let collectors = CollectorSet::new(&platform);
//! let line = render(StatusTable::builtin(), &collectors);
//! println!("{}", line.text);
//! # Ok::<(), SlhError>(())
//! ```

pub mod prelude;

pub mod collectors;
pub mod core;
pub mod daemon;
pub mod logger;
pub mod platform;
pub mod render;

//! Status-line table: refresh interval, unknown-value placeholder, output
//! bound, and the ordered (collector, format, argument) records.
//!
//! The compiled-in table is a `static` and lives for the whole process. A
//! table read from the config file is another immutable [`StatusTable`];
//! swapping between them goes through [`TableHandle::publish`], which replaces
//! the whole table at once so a render pass never sees a mix of two tables.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::collectors::CollectorKind;
use crate::core::errors::{Result, SlhError};
use crate::render::template;

/// Interval between refresh passes, in milliseconds.
pub const INTERVAL_MS: u64 = 1000;

/// Text shown when a collector cannot produce a value.
pub const UNKNOWN_STR: &str = "n/a";

/// Buffer size of the assembled status line (one byte is reserved, so the
/// rendered text is at most `MAXLEN - 1` bytes).
pub const MAXLEN: usize = 2048;

/// Records of the compiled-in table, in left-to-right render order.
pub static ARGS: [ArgRecord; 4] = [
    ArgRecord::builtin(CollectorKind::CpuPerc, " CPU %s%% |", None),
    ArgRecord::builtin(CollectorKind::RamPerc, " MEM %s%% |", None),
    ArgRecord::builtin(CollectorKind::WifiEssid, " %s |", Some("wlan0")),
    ArgRecord::builtin(CollectorKind::Datetime, " %s ", Some("%H:%M")),
];

static BUILTIN: StatusTable = StatusTable {
    interval_ms: INTERVAL_MS,
    unknown_str: Cow::Borrowed(UNKNOWN_STR),
    max_len: MAXLEN,
    args: Cow::Borrowed(&ARGS),
};

/// One entry of the table: which collector to call, the template its value
/// goes into, and the optional argument handed to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgRecord {
    #[serde(rename = "function")]
    collector: CollectorKind,
    format: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    argument: Option<Cow<'static, str>>,
}

impl ArgRecord {
    const fn builtin(
        collector: CollectorKind,
        format: &'static str,
        argument: Option<&'static str>,
    ) -> Self {
        let argument = match argument {
            Some(raw) => Some(Cow::Borrowed(raw)),
            None => None,
        };
        Self {
            collector,
            format: Cow::Borrowed(format),
            argument,
        }
    }

    /// Build a record from owned parts. The template is checked.
    pub fn new(
        collector: CollectorKind,
        format: impl Into<String>,
        argument: Option<String>,
    ) -> Result<Self> {
        let record = Self {
            collector,
            format: Cow::Owned(format.into()),
            argument: argument.map(Cow::Owned),
        };
        record.validate()?;
        Ok(record)
    }

    pub fn collector(&self) -> CollectorKind {
        self.collector
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    fn validate(&self) -> Result<()> {
        template::validate(&self.format)?;
        if self.collector.requires_argument() && self.argument.is_none() {
            return Err(SlhError::InvalidConfig {
                details: format!(
                    "{} record with format {:?} needs an argument",
                    self.collector.name(),
                    self.format
                ),
            });
        }
        Ok(())
    }
}

/// The full status-line table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusTable {
    interval_ms: u64,
    unknown_str: Cow<'static, str>,
    max_len: usize,
    args: Cow<'static, [ArgRecord]>,
}

impl Default for StatusTable {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl StatusTable {
    /// The compiled-in table.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Build and validate a table from owned parts.
    pub fn new(
        interval_ms: u64,
        unknown_str: impl Into<String>,
        max_len: usize,
        args: Vec<ArgRecord>,
    ) -> Result<Self> {
        let table = Self {
            interval_ms,
            unknown_str: Cow::Owned(unknown_str.into()),
            max_len,
            args: Cow::Owned(args),
        };
        table.validate()?;
        Ok(table)
    }

    /// Milliseconds between refresh passes.
    pub fn interval(&self) -> u64 {
        self.interval_ms
    }

    /// Placeholder substituted for unavailable values.
    pub fn unknown_str(&self) -> &str {
        &self.unknown_str
    }

    /// Buffer bound of the rendered line.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Records in render order. Each call starts from the first record.
    pub fn args(&self) -> &[ArgRecord] {
        &self.args
    }

    pub(crate) fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    pub(crate) fn set_unknown_str(&mut self, unknown_str: String) {
        self.unknown_str = Cow::Owned(unknown_str);
    }

    pub(crate) fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len;
    }

    /// Check the invariants every published table must hold.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(SlhError::InvalidConfig {
                details: "status.interval_ms must be > 0".to_string(),
            });
        }
        if self.max_len == 0 {
            return Err(SlhError::InvalidConfig {
                details: "status.max_len must be > 0".to_string(),
            });
        }
        for (index, record) in self.args.iter().enumerate() {
            record.validate().map_err(|err| SlhError::InvalidConfig {
                details: format!("status.args[{index}]: {err}"),
            })?;
        }
        Ok(())
    }
}

/// Shared handle to the currently published table.
///
/// Readers take an `Arc` snapshot per render pass; a reload publishes a new
/// table without touching the one readers already hold.
#[derive(Debug, Clone)]
pub struct TableHandle {
    current: Arc<RwLock<Arc<StatusTable>>>,
}

impl Default for TableHandle {
    fn default() -> Self {
        Self::new(StatusTable::default())
    }
}

impl TableHandle {
    pub fn new(table: StatusTable) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    /// Snapshot of the published table.
    pub fn current(&self) -> Arc<StatusTable> {
        Arc::clone(&self.current.read())
    }

    /// Replace the published table, returning the previous one.
    pub fn publish(&self, table: StatusTable) -> Arc<StatusTable> {
        std::mem::replace(&mut *self.current.write(), Arc::new(table))
    }
}

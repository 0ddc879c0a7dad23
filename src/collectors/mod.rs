//! Metric collectors: one per [`CollectorKind`], each producing the text that
//! goes into a record's `%s` slot or an error meaning "unavailable".

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::platform::pal::Platform;

pub mod cpu;
pub mod datetime;
pub mod ram;
pub mod wifi;

pub use cpu::CpuPercent;
pub use datetime::Datetime;
pub use ram::RamPercent;
pub use wifi::WifiEssid;

/// Produce display text for one metric, given the record's optional argument.
///
/// An `Err` is the unavailability signal; the renderer substitutes the
/// table's placeholder and keeps going.
pub trait Collector: Send + Sync {
    fn collect(&self, argument: Option<&str>) -> Result<String>;
}

/// The fixed set of collectors a table record can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorKind {
    CpuPerc,
    RamPerc,
    WifiEssid,
    Datetime,
}

impl CollectorKind {
    pub const ALL: [Self; 4] = [Self::CpuPerc, Self::RamPerc, Self::WifiEssid, Self::Datetime];

    /// Name used in config files and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CpuPerc => "cpu_perc",
            Self::RamPerc => "ram_perc",
            Self::WifiEssid => "wifi_essid",
            Self::Datetime => "datetime",
        }
    }

    /// Whether a record using this collector must carry an argument.
    pub const fn requires_argument(self) -> bool {
        matches!(self, Self::WifiEssid | Self::Datetime)
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of the collector behind each [`CollectorKind`].
pub trait CollectorRegistry {
    fn collector(&self, kind: CollectorKind) -> &dyn Collector;
}

/// One live collector per kind, all reading from the same platform.
///
/// Collectors that keep state between passes (CPU) keep it here, so a table
/// swap on reload does not reset it.
pub struct CollectorSet {
    cpu: CpuPercent,
    ram: RamPercent,
    wifi: WifiEssid,
    datetime: Datetime,
}

impl CollectorSet {
    pub fn new(platform: &Arc<dyn Platform>) -> Self {
        Self {
            cpu: CpuPercent::new(Arc::clone(platform)),
            ram: RamPercent::new(Arc::clone(platform)),
            wifi: WifiEssid::new(Arc::clone(platform)),
            datetime: Datetime::new(Arc::clone(platform)),
        }
    }
}

impl CollectorRegistry for CollectorSet {
    fn collector(&self, kind: CollectorKind) -> &dyn Collector {
        match kind {
            CollectorKind::CpuPerc => &self.cpu,
            CollectorKind::RamPerc => &self.ram,
            CollectorKind::WifiEssid => &self.wifi,
            CollectorKind::Datetime => &self.datetime,
        }
    }
}

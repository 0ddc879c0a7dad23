//! CPU load as an integer percentage of busy jiffies between two samples.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::collectors::Collector;
use crate::core::errors::{Result, SlhError};
use crate::platform::pal::{CpuTimes, Platform};

const NAME: &str = "cpu_perc";

/// Busy share of CPU time since the previous call.
///
/// The first call only records a baseline and reports unavailable.
pub struct CpuPercent {
    platform: Arc<dyn Platform>,
    previous: Mutex<Option<CpuTimes>>,
}

impl CpuPercent {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            previous: Mutex::new(None),
        }
    }
}

impl Collector for CpuPercent {
    fn collect(&self, _argument: Option<&str>) -> Result<String> {
        let current = self.platform.cpu_times()?;
        let Some(previous) = self.previous.lock().replace(current) else {
            return Err(SlhError::unavailable(NAME, "first sample, no baseline yet"));
        };
        busy_percent(&previous, &current).map(|pct| pct.to_string())
    }
}

fn busy_percent(previous: &CpuTimes, current: &CpuTimes) -> Result<u64> {
    let total = current.total().saturating_sub(previous.total());
    if total == 0 {
        return Err(SlhError::unavailable(NAME, "no CPU time elapsed between samples"));
    }
    let busy = current.busy().saturating_sub(previous.busy());
    Ok(busy.saturating_mul(100) / total)
}

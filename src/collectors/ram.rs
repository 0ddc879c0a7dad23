//! Memory usage as an integer percentage of total RAM.

use std::sync::Arc;

use crate::collectors::Collector;
use crate::core::errors::{Result, SlhError};
use crate::platform::pal::{MemoryInfo, Platform};

/// Used memory, excluding buffers and page cache, as a share of the total.
pub struct RamPercent {
    platform: Arc<dyn Platform>,
}

impl RamPercent {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

impl Collector for RamPercent {
    fn collect(&self, _argument: Option<&str>) -> Result<String> {
        let info = self.platform.memory_info()?;
        used_percent(&info).map(|pct| pct.to_string())
    }
}

fn used_percent(info: &MemoryInfo) -> Result<u64> {
    if info.total_bytes == 0 {
        return Err(SlhError::unavailable("ram_perc", "MemTotal is zero"));
    }
    let used = info
        .total_bytes
        .saturating_sub(info.free_bytes)
        .saturating_sub(info.buffers_bytes)
        .saturating_sub(info.cached_bytes);
    let pct = u128::from(used) * 100 / u128::from(info.total_bytes);
    Ok(u64::try_from(pct).unwrap_or(100))
}

//! Local date/time rendered with a strftime-style pattern.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};

use crate::collectors::Collector;
use crate::core::errors::{Result, SlhError};
use crate::platform::pal::Platform;

const NAME: &str = "datetime";

/// Argument: the pattern, e.g. `%H:%M` or `%a %d %b %H:%M`.
pub struct Datetime {
    platform: Arc<dyn Platform>,
}

impl Datetime {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

impl Collector for Datetime {
    fn collect(&self, argument: Option<&str>) -> Result<String> {
        let pattern = argument.ok_or(SlhError::MissingArgument { collector: NAME })?;

        // Formatting an invalid item makes `Display` fail, and `to_string`
        // would panic on that; reject the pattern up front instead.
        let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(SlhError::unavailable(
                NAME,
                format!("invalid strftime pattern {pattern:?}"),
            ));
        }

        let now = self.platform.local_now();
        let mut out = String::new();
        write!(out, "{}", now.format_with_items(items.into_iter())).map_err(|_| {
            SlhError::unavailable(NAME, format!("cannot format pattern {pattern:?}"))
        })?;
        Ok(out)
    }
}

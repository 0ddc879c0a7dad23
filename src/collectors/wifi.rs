//! SSID of the network a wireless interface is associated with.

use std::sync::Arc;

use crate::collectors::Collector;
use crate::core::errors::{Result, SlhError};
use crate::platform::pal::Platform;

const NAME: &str = "wifi_essid";

/// Argument: the interface name, e.g. `wlan0`.
pub struct WifiEssid {
    platform: Arc<dyn Platform>,
}

impl WifiEssid {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

impl Collector for WifiEssid {
    fn collect(&self, argument: Option<&str>) -> Result<String> {
        let interface = argument
            .map(str::trim)
            .filter(|iface| !iface.is_empty())
            .ok_or(SlhError::MissingArgument { collector: NAME })?;

        if !self.platform.interface_exists(interface) {
            return Err(SlhError::unavailable(
                NAME,
                format!("no such interface: {interface}"),
            ));
        }

        self.platform
            .wireless_essid(interface)?
            .ok_or_else(|| SlhError::unavailable(NAME, format!("{interface} is not connected")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::pal::MockPlatform;
    use chrono::Local;

    fn collector() -> WifiEssid {
        let platform = MockPlatform::new(Local::now())
            .with_interface("wlan0", Some("home-net"))
            .with_interface("wlan1", None);
        WifiEssid::new(Arc::new(platform))
    }

    #[test]
    fn reports_ssid() {
        assert_eq!(collector().collect(Some("wlan0")).unwrap(), "home-net");
    }

    #[test]
    fn disconnected_is_unavailable() {
        let err = collector().collect(Some("wlan1")).expect_err("disconnected");
        assert!(err.to_string().contains("not connected"));
    }

    #[test]
    fn missing_interface_is_unavailable() {
        let err = collector().collect(Some("wlan9")).expect_err("absent");
        assert!(err.to_string().contains("no such interface"));
    }

    #[test]
    fn argument_is_required() {
        let err = collector().collect(None).expect_err("no argument");
        assert_eq!(err.code(), "SLH-2002");
        assert!(collector().collect(Some("  ")).is_err());
    }
}

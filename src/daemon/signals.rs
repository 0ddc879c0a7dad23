//! Signal handling: SIGTERM/SIGINT stop the loop, SIGHUP reloads the config,
//! SIGUSR1 forces an immediate refresh.
//!
//! `signal-hook` only flips atomic flags; the loop polls them between refresh
//! passes and while it sleeps.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Upper bound on how long a sleeping loop goes without looking at the flags.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Why [`SignalHandler::sleep`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full duration passed.
    Elapsed,
    Shutdown,
    Reload,
    Refresh,
}

/// Flags shared between the signal hooks and the daemon loop.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
    reload_flag: Arc<AtomicBool>,
    refresh_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register the OS hooks. A hook that fails to
    /// register is reported on stderr and otherwise ignored.
    pub fn new() -> Self {
        let handler = Self::unregistered();
        handler.register_signals();
        handler
    }

    /// Handler with no OS hooks; only the `request_*` methods set its flags.
    pub fn unregistered() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            reload_flag: Arc::new(AtomicBool::new(false)),
            refresh_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sticky: stays set once requested.
    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Check and clear.
    pub fn should_reload(&self) -> bool {
        self.reload_flag.swap(false, Ordering::Relaxed)
    }

    /// Check and clear.
    pub fn should_refresh(&self) -> bool {
        self.refresh_flag.swap(false, Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_reload(&self) {
        self.reload_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_refresh(&self) {
        self.refresh_flag.store(true, Ordering::Relaxed);
    }

    /// Sleep for `duration`, returning early when a flag is raised.
    ///
    /// Shutdown wins over reload, reload over refresh. Reload and refresh
    /// flags are consumed by the wake-up that reports them.
    pub fn sleep(&self, duration: Duration) -> Wake {
        let deadline = Instant::now() + duration;
        loop {
            if self.should_shutdown() {
                return Wake::Shutdown;
            }
            if self.should_reload() {
                return Wake::Reload;
            }
            if self.should_refresh() {
                return Wake::Refresh;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wake::Elapsed;
            }
            thread::sleep(POLL_SLICE.min(deadline - now));
        }
    }

    fn register_signals(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[SLH-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[SLH-SIGNAL] failed to register SIGINT: {e}");
        }

        #[cfg(unix)]
        {
            use signal_hook::consts::{SIGHUP, SIGUSR1};
            if let Err(e) = signal_hook::flag::register(SIGHUP, Arc::clone(&self.reload_flag)) {
                eprintln!("[SLH-SIGNAL] failed to register SIGHUP: {e}");
            }
            if let Err(e) = signal_hook::flag::register(SIGUSR1, Arc::clone(&self.refresh_flag)) {
                eprintln!("[SLH-SIGNAL] failed to register SIGUSR1: {e}");
            }
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handler_has_no_requests() {
        let handler = SignalHandler::unregistered();
        assert!(!handler.should_shutdown());
        assert!(!handler.should_reload());
        assert!(!handler.should_refresh());
    }

    #[test]
    fn shutdown_is_sticky() {
        let handler = SignalHandler::unregistered();
        handler.request_shutdown();
        assert!(handler.should_shutdown());
        assert!(handler.should_shutdown());
    }

    #[test]
    fn reload_and_refresh_clear_on_read() {
        let handler = SignalHandler::unregistered();
        handler.request_reload();
        handler.request_refresh();
        assert!(handler.should_reload());
        assert!(!handler.should_reload());
        assert!(handler.should_refresh());
        assert!(!handler.should_refresh());
    }

    #[test]
    fn clones_share_flags() {
        let handler = SignalHandler::unregistered();
        let other = handler.clone();
        other.request_shutdown();
        assert!(handler.should_shutdown());
    }

    #[test]
    fn sleep_runs_full_duration_without_requests() {
        let handler = SignalHandler::unregistered();
        let start = Instant::now();
        assert_eq!(handler.sleep(Duration::from_millis(30)), Wake::Elapsed);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn sleep_wakes_early_on_refresh_from_another_thread() {
        let handler = SignalHandler::unregistered();
        let remote = handler.clone();
        let poke = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.request_refresh();
        });

        let start = Instant::now();
        assert_eq!(handler.sleep(Duration::from_secs(10)), Wake::Refresh);
        assert!(start.elapsed() < Duration::from_secs(5));
        poke.join().unwrap();
    }

    #[test]
    fn shutdown_takes_priority() {
        let handler = SignalHandler::unregistered();
        handler.request_refresh();
        handler.request_reload();
        handler.request_shutdown();
        assert_eq!(handler.sleep(Duration::from_secs(1)), Wake::Shutdown);
        // The pending reload was not consumed.
        assert!(handler.should_reload());
    }

    #[test]
    fn zero_duration_returns_immediately() {
        let handler = SignalHandler::unregistered();
        assert_eq!(handler.sleep(Duration::ZERO), Wake::Elapsed);
    }
}

//! Main refresh loop.
//!
//! Each pass takes a snapshot of the published table, renders it, and hands
//! the line to the sink. The loop then sleeps for whatever is left of the
//! interval, waking early for signals:
//! - SIGTERM/SIGINT: stop after the current pass
//! - SIGHUP: reload the config file and publish the new table
//! - SIGUSR1: render again right away
//!
//! Availability changes and truncation are reported to stderr and the
//! activity log once per transition, not once per pass.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::collectors::CollectorSet;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::core::table::{StatusTable, TableHandle};
use crate::daemon::signals::{SignalHandler, Wake};
use crate::daemon::sink::StatusSink;
use crate::logger::activity::{
    ActivityEvent, ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger,
};
use crate::platform::pal::{Platform, detect_platform};
use crate::render::line::{RenderedLine, render};

/// Arguments for `slh run`.
#[derive(Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Render a single line and exit.
    pub once: bool,
    /// File re-read on SIGHUP. `None` means the default location.
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Availability {
    /// Not rendered since start or the last reload.
    Unseen,
    /// Failed on its first pass; one more failure makes it unavailable.
    /// Covers collectors that need two samples before they have a value.
    Pending,
    Available,
    Unavailable,
}

/// Per-record availability, turned into events only on transitions.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    states: Vec<Availability>,
    truncated: bool,
}

impl AvailabilityTracker {
    /// Forget all state, e.g. after a new table is published.
    pub fn reset(&mut self) {
        self.states.clear();
        self.truncated = false;
    }

    /// Compare this pass against the previous ones and return the events
    /// worth reporting.
    pub fn observe(&mut self, table: &StatusTable, line: &RenderedLine) -> Vec<ActivityEvent> {
        let args = table.args();
        if self.states.len() != args.len() {
            self.states = vec![Availability::Unseen; args.len()];
        }

        let mut events = Vec::new();
        for (index, record) in args.iter().enumerate().take(line.rendered) {
            let failure = line.failures.iter().find(|f| f.index == index);
            let state = &mut self.states[index];
            let next = match (*state, failure) {
                (Availability::Unseen, Some(_)) => Availability::Pending,
                (Availability::Pending | Availability::Available, Some(failure)) => {
                    events.push(ActivityEvent::CollectorUnavailable {
                        record: index,
                        collector: record.collector().name().to_string(),
                        argument: record.argument().map(str::to_string),
                        error_code: failure.error.code().to_string(),
                        details: failure.error.to_string(),
                    });
                    Availability::Unavailable
                }
                (Availability::Unavailable, Some(_)) => Availability::Unavailable,
                (Availability::Unavailable, None) => {
                    events.push(ActivityEvent::CollectorRecovered {
                        record: index,
                        collector: record.collector().name().to_string(),
                        argument: record.argument().map(str::to_string),
                    });
                    Availability::Available
                }
                (Availability::Unseen | Availability::Pending | Availability::Available, None) => {
                    Availability::Available
                }
            };
            *state = next;
        }

        if line.truncated && !self.truncated {
            events.push(ActivityEvent::OutputTruncated {
                length: line.text.len(),
                max_len: table.max_len(),
            });
        }
        self.truncated = line.truncated;

        events
    }
}

/// The status-line daemon.
pub struct StatusDaemon<S: StatusSink> {
    config: Config,
    args: DaemonArgs,
    table: TableHandle,
    collectors: CollectorSet,
    sink: S,
    logger_handle: ActivityLoggerHandle,
    logger_join: Option<thread::JoinHandle<()>>,
    signal_handler: SignalHandler,
    tracker: AvailabilityTracker,
    start_time: Instant,
}

impl<S: StatusSink> StatusDaemon<S> {
    /// Build the daemon: detect the platform, start the activity logger when
    /// enabled, and register signal hooks.
    pub fn init(config: Config, args: DaemonArgs, sink: S) -> Result<Self> {
        let platform = detect_platform()?;

        let (logger_handle, logger_join) = if config.log.enabled {
            let (handle, join) = spawn_logger(ActivityLoggerConfig::from(&config.log))?;
            (handle, Some(join))
        } else {
            (ActivityLoggerHandle::disabled(), None)
        };

        let mut daemon = Self::with_parts(
            config,
            args,
            &platform,
            sink,
            SignalHandler::new(),
            logger_handle,
        );
        daemon.logger_join = logger_join;
        Ok(daemon)
    }

    /// Build the daemon from explicit parts, without OS hooks or threads.
    pub fn with_parts(
        config: Config,
        args: DaemonArgs,
        platform: &Arc<dyn Platform>,
        sink: S,
        signal_handler: SignalHandler,
        logger_handle: ActivityLoggerHandle,
    ) -> Self {
        let table = TableHandle::new(config.status.clone());
        Self {
            config,
            args,
            table,
            collectors: CollectorSet::new(platform),
            sink,
            logger_handle,
            logger_join: None,
            signal_handler,
            tracker: AvailabilityTracker::default(),
            start_time: Instant::now(),
        }
    }

    /// Handle to the published table.
    pub fn table(&self) -> TableHandle {
        self.table.clone()
    }

    /// Handle to the flags the loop polls.
    pub fn signals(&self) -> SignalHandler {
        self.signal_handler.clone()
    }

    /// Run until shutdown is requested, or for one pass with `--once`.
    ///
    /// A sink failure ends the loop and is returned.
    pub fn run(&mut self) -> Result<()> {
        let config_hash = self.config.stable_hash().unwrap_or_default();
        self.logger_handle.send(ActivityEvent::DaemonStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash,
            interval_ms: self.config.status.interval(),
        });

        let outcome = self.run_loop();
        let reason = match &outcome {
            Ok(()) => "clean shutdown".to_string(),
            Err(e) => {
                eprintln!("[SLH-DAEMON] stopping: {e}");
                self.logger_handle.send(ActivityEvent::Error {
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
                format!("error {}", e.code())
            }
        };
        self.shutdown(&reason);
        outcome
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            if self.signal_handler.should_shutdown() {
                eprintln!("[SLH-DAEMON] shutdown requested");
                return Ok(());
            }
            if self.signal_handler.should_reload() {
                self.handle_config_reload();
            }

            let started = Instant::now();
            let table = self.table.current();
            self.refresh(&table)?;

            if self.args.once {
                return Ok(());
            }

            let interval = Duration::from_millis(table.interval());
            match self
                .signal_handler
                .sleep(interval.saturating_sub(started.elapsed()))
            {
                Wake::Elapsed | Wake::Shutdown => {}
                Wake::Reload => self.handle_config_reload(),
                Wake::Refresh => eprintln!("[SLH-DAEMON] refresh requested (SIGUSR1)"),
            }
        }
    }

    /// Render the published table once and publish the line.
    pub fn run_once(&mut self) -> Result<RenderedLine> {
        let table = self.table.current();
        self.refresh(&table)
    }

    fn refresh(&mut self, table: &StatusTable) -> Result<RenderedLine> {
        let line = render(table, &self.collectors);
        self.sink.publish(&line.text)?;

        for event in self.tracker.observe(table, &line) {
            report_transition(&event);
            self.logger_handle.send(event);
        }
        Ok(line)
    }

    fn handle_config_reload(&mut self) {
        eprintln!("[SLH-DAEMON] config reload requested (SIGHUP)");

        match Config::load(self.args.config_path.as_deref()) {
            Ok(new_config) => {
                let old_hash = self.config.stable_hash().unwrap_or_default();
                let new_hash = new_config.stable_hash().unwrap_or_default();
                if old_hash == new_hash {
                    eprintln!("[SLH-DAEMON] config unchanged, skipping reload");
                    return;
                }

                // Log settings stay as they were at startup.
                self.table.publish(new_config.status.clone());
                self.tracker.reset();
                self.logger_handle.send(ActivityEvent::ConfigReloaded {
                    config_hash: new_hash,
                    interval_ms: new_config.status.interval(),
                });
                self.config = new_config;
                eprintln!("[SLH-DAEMON] config reloaded successfully");
            }
            Err(e) => {
                eprintln!("[SLH-DAEMON] config reload failed, keeping current table: {e}");
                self.logger_handle.send(ActivityEvent::Error {
                    code: e.code().to_string(),
                    message: format!("config reload failed: {e}"),
                });
            }
        }
    }

    fn shutdown(&mut self, reason: &str) {
        let uptime_secs = self.start_time.elapsed().as_secs();
        self.logger_handle.send(ActivityEvent::DaemonStopped {
            reason: reason.to_string(),
            uptime_secs,
        });
        self.logger_handle.shutdown();
        if let Some(join) = self.logger_join.take() {
            let _ = join.join();
        }
        if !self.args.once {
            eprintln!("[SLH-DAEMON] shutdown complete (uptime={uptime_secs}s)");
        }
    }
}

fn report_transition(event: &ActivityEvent) {
    match event {
        ActivityEvent::CollectorUnavailable {
            record, details, ..
        } => eprintln!("[SLH-DAEMON] record {record}: {details}"),
        ActivityEvent::CollectorRecovered {
            record, collector, ..
        } => eprintln!("[SLH-DAEMON] record {record}: {collector} recovered"),
        ActivityEvent::OutputTruncated { length, max_len } => {
            eprintln!("[SLH-DAEMON] status line truncated to {length} bytes (max_len={max_len})");
        }
        _ => {}
    }
}

//! Activity logger thread.
//!
//! A dedicated thread owns the [`JsonlWriter`]. The daemon loop sends
//! [`ActivityEvent`]s over a bounded crossbeam channel with `try_send`, so a
//! slow disk can delay log lines but never a status line.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::config::LogConfig;
use crate::core::errors::{Result, SlhError};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

const CHANNEL_CAPACITY: usize = 256;

/// Events the daemon reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    DaemonStarted {
        version: String,
        config_hash: String,
        interval_ms: u64,
    },
    DaemonStopped {
        reason: String,
        uptime_secs: u64,
    },
    ConfigReloaded {
        config_hash: String,
        interval_ms: u64,
    },
    CollectorUnavailable {
        record: usize,
        collector: String,
        argument: Option<String>,
        error_code: String,
        details: String,
    },
    CollectorRecovered {
        record: usize,
        collector: String,
        argument: Option<String>,
    },
    OutputTruncated {
        length: usize,
        max_len: usize,
    },
    Error {
        code: String,
        message: String,
    },
    /// Ends the logger thread once queued events are written.
    Shutdown,
}

/// Cloneable sender side of the logger.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// A handle whose events go nowhere, used when the activity log is off.
    pub fn disabled() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event without blocking. A full channel drops the event and
    /// bumps the dropped counter.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to write what is queued and exit.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

/// Options for [`spawn_logger`].
#[derive(Debug, Clone)]
pub struct ActivityLoggerConfig {
    pub jsonl: JsonlConfig,
    pub channel_capacity: usize,
}

impl From<&LogConfig> for ActivityLoggerConfig {
    fn from(cfg: &LogConfig) -> Self {
        Self {
            jsonl: JsonlConfig::from(cfg),
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Start the logger thread.
///
/// The thread exits on [`ActivityLoggerHandle::shutdown`] or once every
/// handle is dropped.
pub fn spawn_logger(
    config: ActivityLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: Arc::clone(&dropped),
    };

    let join = thread::Builder::new()
        .name("slh-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config.jsonl, &dropped))
        .map_err(|e| SlhError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<ActivityEvent>, jsonl: JsonlConfig, dropped: &AtomicU64) {
    let mut writer = JsonlWriter::open(jsonl);

    while let Ok(event) = rx.recv() {
        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{lost} log events dropped due to back-pressure"));
            writer.write_entry(&warn);
        }

        if event == ActivityEvent::Shutdown {
            break;
        }
        writer.write_entry(&to_log_entry(&event));
    }
}

fn to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::DaemonStarted {
            version,
            config_hash,
            interval_ms,
        } => {
            let mut e = LogEntry::new(EventType::DaemonStart, Severity::Info);
            e.config_hash = Some(config_hash.clone());
            e.interval_ms = Some(*interval_ms);
            e.details = Some(format!("version={version}"));
            e
        }
        ActivityEvent::DaemonStopped {
            reason,
            uptime_secs,
        } => {
            let mut e = LogEntry::new(EventType::DaemonStop, Severity::Info);
            e.details = Some(format!("reason={reason} uptime={uptime_secs}s"));
            e
        }
        ActivityEvent::ConfigReloaded {
            config_hash,
            interval_ms,
        } => {
            let mut e = LogEntry::new(EventType::ConfigReload, Severity::Info);
            e.config_hash = Some(config_hash.clone());
            e.interval_ms = Some(*interval_ms);
            e
        }
        ActivityEvent::CollectorUnavailable {
            record,
            collector,
            argument,
            error_code,
            details,
        } => {
            let mut e = LogEntry::new(EventType::CollectorUnavailable, Severity::Warning);
            e.record = Some(*record);
            e.collector = Some(collector.clone());
            e.argument.clone_from(argument);
            e.error_code = Some(error_code.clone());
            e.details = Some(details.clone());
            e
        }
        ActivityEvent::CollectorRecovered {
            record,
            collector,
            argument,
        } => {
            let mut e = LogEntry::new(EventType::CollectorRecovered, Severity::Info);
            e.record = Some(*record);
            e.collector = Some(collector.clone());
            e.argument.clone_from(argument);
            e
        }
        ActivityEvent::OutputTruncated { length, max_len } => {
            let mut e = LogEntry::new(EventType::OutputTruncated, Severity::Warning);
            e.length = Some(*length);
            e.details = Some(format!("max_len={max_len}"));
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Error);
            e.error_code = Some(code.clone());
            e.details = Some(message.clone());
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::DaemonStop, Severity::Info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn logger_at(path: &Path, capacity: usize) -> ActivityLoggerConfig {
        ActivityLoggerConfig {
            jsonl: JsonlConfig {
                path: path.to_path_buf(),
                fallback_path: None,
                max_size_bytes: 1024 * 1024,
                max_rotated_files: 1,
            },
            channel_capacity: capacity,
        }
    }

    fn read_events(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn events_reach_the_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let (handle, join) = spawn_logger(logger_at(&path, 16)).unwrap();

        handle.send(ActivityEvent::DaemonStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc".to_string(),
            interval_ms: 1000,
        });
        handle.send(ActivityEvent::CollectorUnavailable {
            record: 2,
            collector: "wifi_essid".to_string(),
            argument: Some("wlan0".to_string()),
            error_code: "SLH-2001".to_string(),
            details: "not connected".to_string(),
        });
        handle.send(ActivityEvent::CollectorRecovered {
            record: 2,
            collector: "wifi_essid".to_string(),
            argument: Some("wlan0".to_string()),
        });
        handle.shutdown();
        join.join().unwrap();

        let events = read_events(&path);
        let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            ["daemon_start", "collector_unavailable", "collector_recovered"]
        );
        assert_eq!(events[0]["config_hash"], "abc");
        assert_eq!(events[1]["error_code"], "SLH-2001");
        assert_eq!(events[1]["argument"], "wlan0");
    }

    #[test]
    fn thread_exits_when_handles_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drop.jsonl");
        let (handle, join) = spawn_logger(logger_at(&path, 4)).unwrap();
        handle.send(ActivityEvent::OutputTruncated {
            length: 2047,
            max_len: 2048,
        });
        drop(handle);
        join.join().unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["length"], 2047);
    }

    #[test]
    fn disabled_handle_accepts_events() {
        let handle = ActivityLoggerHandle::disabled();
        handle.send(ActivityEvent::Error {
            code: "SLH-3900".to_string(),
            message: "x".to_string(),
        });
        handle.shutdown();
        assert_eq!(handle.dropped_events(), 0);
    }

    #[test]
    fn full_channel_counts_drops() {
        let (tx, _rx) = bounded(1);
        let handle = ActivityLoggerHandle {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        };
        for _ in 0..3 {
            handle.send(ActivityEvent::Shutdown);
        }
        assert_eq!(handle.dropped_events(), 2);
    }

    #[test]
    fn error_events_carry_code() {
        let entry = to_log_entry(&ActivityEvent::Error {
            code: "SLH-3002".to_string(),
            message: "stdout closed".to_string(),
        });
        assert_eq!(entry.event, EventType::Error);
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.error_code.as_deref(), Some("SLH-3002"));
    }
}

//! Activity log: one JSON object per line, appended to a rotating file.
//!
//! Each line is serialized in full and handed to the file in one unbuffered
//! `write_all`, so a reader tailing the log never sees half an entry and a
//! failing disk is noticed on the write that hits it.
//!
//! When the primary file cannot be written the writer moves down a chain:
//! fallback file, then stderr with an `[SLH-JSONL]` prefix, then discard. It
//! never reports failure to the caller; a broken log must not stop the
//! status line.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::LogConfig;
use crate::core::errors::{Result, SlhError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DaemonStart,
    DaemonStop,
    ConfigReload,
    CollectorUnavailable,
    CollectorRecovered,
    OutputTruncated,
    Error,
}

/// A single activity log line. Only `ts`, `event` and `severity` are always
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp with milliseconds.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Collector name, for availability events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector: Option<String>,
    /// Position of the record in the status table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    /// Rendered length in bytes, for truncation events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// New entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            collector: None,
            record: None,
            argument: None,
            interval_ms: None,
            config_hash: None,
            length: None,
            error_code: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

impl Sink {
    const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Stderr => "stderr",
            Self::Discard => "discard",
        }
    }
}

/// Settings for [`JsonlWriter`].
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the current file would grow past this size.
    pub max_size_bytes: u64,
    /// Rotated generations kept next to the live file (`.1` is newest).
    pub max_rotated_files: u32,
}

impl From<&LogConfig> for JsonlConfig {
    fn from(cfg: &LogConfig) -> Self {
        Self {
            path: cfg.jsonl_path.clone(),
            fallback_path: cfg.fallback_path.clone(),
            max_size_bytes: cfg.max_size_bytes,
            max_rotated_files: cfg.max_rotated_files,
        }
    }
}

/// Append-only JSONL writer with size-based rotation.
pub struct JsonlWriter {
    config: JsonlConfig,
    file: Option<File>,
    sink: Sink,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the primary file, or the best sink below it.
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            file: None,
            sink: Sink::Discard,
            bytes_written: 0,
        };
        match open_append(&writer.config.path) {
            Ok((file, size)) => writer.attach(file, size, Sink::Primary),
            Err(_) => writer.open_fallback(),
        }
        writer
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.write_line(&line);
            }
            Err(err) => {
                let _ = writeln!(io::stderr(), "[SLH-JSONL] serialize error: {err}");
            }
        }
    }

    /// Which sink entries currently go to.
    pub fn state(&self) -> &'static str {
        self.sink.label()
    }

    /// Size of the live file.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn attach(&mut self, file: File, size: u64, sink: Sink) {
        self.file = Some(file);
        self.sink = sink;
        self.bytes_written = size;
    }

    fn active_path(&self) -> Option<&Path> {
        match self.sink {
            Sink::Primary => Some(&self.config.path),
            Sink::Fallback => self.config.fallback_path.as_deref(),
            Sink::Stderr | Sink::Discard => None,
        }
    }

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if self.file.is_some() && self.bytes_written + len > self.config.max_size_bytes {
            self.rotate();
        }

        match self.sink {
            Sink::Primary | Sink::Fallback => {
                let written = self
                    .file
                    .as_mut()
                    .is_some_and(|file| file.write_all(line.as_bytes()).is_ok());
                if written {
                    self.bytes_written += len;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            Sink::Stderr => {
                if write!(io::stderr(), "[SLH-JSONL] {line}").is_err() {
                    self.sink = Sink::Discard;
                }
            }
            Sink::Discard => {}
        }
    }

    fn open_fallback(&mut self) {
        let Some(fallback) = self.config.fallback_path.clone() else {
            self.sink = Sink::Stderr;
            let _ = writeln!(
                io::stderr(),
                "[SLH-JSONL] cannot open {}, logging to stderr",
                self.config.path.display()
            );
            return;
        };
        match open_append(&fallback) {
            Ok((file, size)) => {
                let _ = writeln!(
                    io::stderr(),
                    "[SLH-JSONL] primary log unavailable, using fallback {}",
                    fallback.display()
                );
                self.attach(file, size, Sink::Fallback);
            }
            Err(_) => {
                self.sink = Sink::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[SLH-JSONL] primary and fallback logs unavailable, logging to stderr"
                );
            }
        }
    }

    fn degrade(&mut self) {
        self.file = None;
        match self.sink {
            Sink::Primary => self.open_fallback(),
            Sink::Fallback => {
                self.sink = Sink::Stderr;
                let _ = writeln!(io::stderr(), "[SLH-JSONL] fallback write failed, logging to stderr");
            }
            Sink::Stderr | Sink::Discard => self.sink = Sink::Discard,
        }
    }

    fn rotate(&mut self) {
        self.file = None;
        let Some(base) = self.active_path().map(Path::to_path_buf) else {
            return;
        };

        let keep = self.config.max_rotated_files;
        let _ = fs::remove_file(rotated_name(&base, keep));
        for generation in (1..keep).rev() {
            let _ = fs::rename(rotated_name(&base, generation), rotated_name(&base, generation + 1));
        }
        let _ = fs::rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                let sink = self.sink;
                self.attach(file, 0, sink);
            }
            Err(_) => self.degrade(),
        }
    }
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SlhError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SlhError::io(path, source))?;
    let size = file.metadata().map_or(0, |meta| meta.len());
    Ok((file, size))
}

/// `activity.jsonl` → `activity.jsonl.2`.
fn rotated_name(base: &Path, generation: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

//! PAL trait and platform-specific implementations.
//!
//! Collectors never touch the OS directly; they go through [`Platform`] so
//! the same code runs against procfs on Linux and against [`MockPlatform`]
//! in tests.

#![allow(missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SlhError};

/// Aggregate CPU time counters (jiffies) from the first `cpu` line of
/// `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
}

impl CpuTimes {
    /// Time spent doing work: everything except idle and iowait.
    #[must_use]
    pub fn busy(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.busy()
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
    }
}

/// Current system memory info, in bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub buffers_bytes: u64,
    pub cached_bytes: u64,
}

/// OS abstraction used by the collectors.
pub trait Platform: Send + Sync {
    fn cpu_times(&self) -> Result<CpuTimes>;
    fn memory_info(&self) -> Result<MemoryInfo>;
    fn interface_exists(&self, interface: &str) -> bool;
    /// SSID the interface is associated with; `None` when not connected.
    fn wireless_essid(&self, interface: &str) -> Result<Option<String>>;
    fn local_now(&self) -> DateTime<Local>;
}

/// How long `iw` or `iwgetid` may run before it is killed.
pub const TOOL_TIMEOUT: Duration = Duration::from_millis(500);

const TOOL_POLL: Duration = Duration::from_millis(10);

/// Linux platform implementation using `/proc`, `/sys` and the `iw` tools.
#[derive(Debug)]
pub struct LinuxPlatform {
    proc_root: PathBuf,
    sys_root: PathBuf,
    /// Directory holding `iw`/`iwgetid`; `None` searches `PATH`.
    tool_dir: Option<PathBuf>,
    tool_timeout: Duration,
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::with_roots("/proc", "/sys")
    }

    /// Read procfs and sysfs from other mount points (used by tests).
    #[must_use]
    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
            tool_dir: None,
            tool_timeout: TOOL_TIMEOUT,
        }
    }

    /// Run the wireless tools from `dir` instead of searching `PATH`.
    #[must_use]
    pub fn with_tool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tool_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    fn tool(&self, name: &str, args: &[&str]) -> std::result::Result<String, ToolError> {
        let program = self
            .tool_dir
            .as_ref()
            .map_or_else(|| PathBuf::from(name), |dir| dir.join(name));
        run_tool(&program, args, self.tool_timeout)
    }

    fn read_proc(&self, name: &str) -> Result<String> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path).map_err(|source| SlhError::io(&path, source))
    }
}

impl Platform for LinuxPlatform {
    fn cpu_times(&self) -> Result<CpuTimes> {
        parse_proc_stat(&self.read_proc("stat")?)
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        parse_meminfo(&self.read_proc("meminfo")?)
    }

    fn interface_exists(&self, interface: &str) -> bool {
        is_valid_interface_name(interface)
            && self.sys_root.join("class/net").join(interface).exists()
    }

    fn wireless_essid(&self, interface: &str) -> Result<Option<String>> {
        if !is_valid_interface_name(interface) {
            return Err(SlhError::unavailable(
                "wifi_essid",
                format!("invalid interface name {interface:?}"),
            ));
        }

        let iw_failure = match self.tool("iw", &["dev", interface, "link"]) {
            Ok(stdout) => return Ok(parse_iw_link(&stdout)),
            Err(ToolError::Missing) => None,
            Err(ToolError::Failed(details)) => Some(details),
        };

        // iwgetid exits non-zero when the interface is not associated.
        match self.tool("iwgetid", &[interface, "--raw"]) {
            Ok(stdout) => Ok(non_empty(stdout.trim())),
            Err(ToolError::Missing) => Err(SlhError::unavailable(
                "wifi_essid",
                iw_failure.unwrap_or_else(|| "neither `iw` nor `iwgetid` is installed".to_string()),
            )),
            Err(ToolError::Failed(details)) => Err(SlhError::unavailable(
                "wifi_essid",
                iw_failure.unwrap_or(details),
            )),
        }
    }

    fn local_now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// In-memory mock implementation for deterministic tests.
#[derive(Debug)]
pub struct MockPlatform {
    cpu_samples: Mutex<VecDeque<CpuTimes>>,
    memory: Option<MemoryInfo>,
    interfaces: HashMap<String, Option<String>>,
    now: DateTime<Local>,
}

impl MockPlatform {
    #[must_use]
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            cpu_samples: Mutex::new(VecDeque::new()),
            memory: None,
            interfaces: HashMap::new(),
            now,
        }
    }

    /// Samples returned by successive `cpu_times` calls.
    #[must_use]
    pub fn with_cpu_samples(self, samples: impl IntoIterator<Item = CpuTimes>) -> Self {
        self.cpu_samples.lock().extend(samples);
        self
    }

    #[must_use]
    pub fn with_memory(mut self, memory: MemoryInfo) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Register an interface and the SSID it reports (`None` = disconnected).
    #[must_use]
    pub fn with_interface(mut self, name: &str, essid: Option<&str>) -> Self {
        self.interfaces
            .insert(name.to_string(), essid.map(str::to_string));
        self
    }

    pub fn push_cpu_sample(&self, sample: CpuTimes) {
        self.cpu_samples.lock().push_back(sample);
    }
}

impl Platform for MockPlatform {
    fn cpu_times(&self) -> Result<CpuTimes> {
        self.cpu_samples
            .lock()
            .pop_front()
            .ok_or_else(|| SlhError::io("/proc/stat", std::io::Error::other("mock: no sample")))
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        self.memory.clone().ok_or_else(|| {
            SlhError::io("/proc/meminfo", std::io::Error::other("mock: no meminfo"))
        })
    }

    fn interface_exists(&self, interface: &str) -> bool {
        self.interfaces.contains_key(interface)
    }

    fn wireless_essid(&self, interface: &str) -> Result<Option<String>> {
        self.interfaces.get(interface).cloned().ok_or_else(|| {
            SlhError::unavailable("wifi_essid", format!("mock: no interface {interface}"))
        })
    }

    fn local_now(&self) -> DateTime<Local> {
        self.now
    }
}

/// Detect active platform implementation.
pub fn detect_platform() -> Result<Arc<dyn Platform>> {
    #[cfg(target_os = "linux")]
    {
        Ok(Arc::new(LinuxPlatform::new()))
    }
    #[cfg(not(target_os = "linux"))]
    {
        Err(SlhError::UnsupportedPlatform {
            details: "only Linux is currently implemented".to_string(),
        })
    }
}

#[derive(Debug)]
enum ToolError {
    Missing,
    Failed(String),
}

/// Run `program` with piped output, killing it once `timeout` passes.
fn run_tool(
    program: &Path,
    args: &[&str],
    timeout: Duration,
) -> std::result::Result<String, ToolError> {
    let name = program.display();
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(ToolError::Missing),
        Err(err) => return Err(ToolError::Failed(format!("{name}: {err}"))),
    };

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::Failed(format!(
                    "{name} timed out after {} ms",
                    timeout.as_millis()
                )));
            }
            Ok(None) => thread::sleep(TOOL_POLL),
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::Failed(format!("{name}: {err}")));
            }
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|err| ToolError::Failed(format!("{name}: {err}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::Failed(format!(
            "{name} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

/// Interface names are single path components of at most 15 bytes (IFNAMSIZ - 1).
fn is_valid_interface_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() < 16
        && name != "."
        && name != ".."
        && !name.contains(['/', '\0'])
        && !name.chars().any(char::is_whitespace)
}

/// Extract the SSID from `iw dev <iface> link` output.
fn parse_iw_link(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with("Not connected") {
        return None;
    }
    raw.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("SSID:"))
        .and_then(|ssid| non_empty(ssid.trim()))
}

fn parse_proc_stat(raw: &str) -> Result<CpuTimes> {
    let Some(line) = raw.lines().find(|line| line.starts_with("cpu ")) else {
        return Err(SlhError::ProcParse {
            source_name: "/proc/stat",
            details: "missing aggregate `cpu` line".to_string(),
        });
    };

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(7)
        .map(|field| {
            field.parse::<u64>().map_err(|err| SlhError::ProcParse {
                source_name: "/proc/stat",
                details: format!("invalid counter {field:?}: {err}"),
            })
        })
        .collect::<Result<Vec<u64>>>()?;

    let &[user, nice, system, idle, iowait, irq, softirq] = fields.as_slice() else {
        return Err(SlhError::ProcParse {
            source_name: "/proc/stat",
            details: format!("expected 7 counters, found {}", fields.len()),
        });
    };

    Ok(CpuTimes {
        user,
        nice,
        system,
        idle,
        iowait,
        irq,
        softirq,
    })
}

fn parse_meminfo(raw: &str) -> Result<MemoryInfo> {
    let mut values = HashMap::<String, u64>::new();

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((key, rest)) = line.split_once(':') else {
            return Err(meminfo_error(format!(
                "invalid meminfo line (missing ':'): {line}"
            )));
        };
        let mut parts = rest.split_whitespace();
        let Some(value_raw) = parts.next() else {
            return Err(meminfo_error(format!("missing meminfo value in line: {line}")));
        };
        let value = value_raw.parse::<u64>().map_err(|err| {
            meminfo_error(format!(
                "invalid meminfo numeric value in line {line:?}: {err}"
            ))
        })?;

        let bytes = match parts.next() {
            None => value,
            Some("kB") => value.saturating_mul(1024),
            Some(unit) => {
                return Err(meminfo_error(format!(
                    "unsupported meminfo unit in line {line:?}: {unit}"
                )));
            }
        };
        values.insert(key.trim().to_string(), bytes);
    }

    let required = |key: &str| {
        values
            .get(key)
            .copied()
            .ok_or_else(|| meminfo_error(format!("missing required meminfo field: {key}")))
    };

    Ok(MemoryInfo {
        total_bytes: required("MemTotal")?,
        free_bytes: required("MemFree")?,
        buffers_bytes: required("Buffers")?,
        cached_bytes: required("Cached")?,
    })
}

fn meminfo_error(details: String) -> SlhError {
    SlhError::ProcParse {
        source_name: "/proc/meminfo",
        details,
    }
}

//! Configuration system: TOML file + env var overrides + compiled-in defaults.
//!
//! With no config file the built-in status table is used as is. A file only
//! needs the keys it changes:
//!
//! ```toml
//! [status]
//! interval_ms = 500
//!
//! [[status.args]]
//! function = "datetime"
//! format = " %s "
//! argument = "%a %d %b %H:%M"
//! ```

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SlhError};
use crate::core::paths;
use crate::core::table::StatusTable;

/// Full slh configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub status: StatusTable,
    pub log: LogConfig,
}

/// Structured activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Write the JSONL activity log. Stderr diagnostics are always on.
    pub enabled: bool,
    pub jsonl_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jsonl_path: paths::default_activity_log(),
            fallback_path: None,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        paths::default_config_file()
    }

    /// The path `load` reads for the given `--config` value.
    #[must_use]
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        path.map_or_else(Self::default_path, Path::to_path_buf)
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path;
    /// the built-in table is used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = Self::resolve_path(path);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SlhError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml(&raw)?
        } else if path.is_some() {
            return Err(SlhError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths(&paths::home_dir());
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Deterministic hash of the effective config for logging and reload
    /// change detection.
    ///
    /// FNV-1a over the canonical JSON, stable across processes and Rust
    /// releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut lookup = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());
        if let Some(raw) = lookup("SLH_INTERVAL_MS") {
            self.status
                .set_interval(parse_env("SLH_INTERVAL_MS", &raw)?);
        }
        if let Some(raw) = lookup("SLH_UNKNOWN_STR") {
            self.status.set_unknown_str(raw);
        }
        if let Some(raw) = lookup("SLH_MAX_LEN") {
            self.status.set_max_len(parse_env("SLH_MAX_LEN", &raw)?);
        }
        if let Some(raw) = lookup("SLH_LOG_ENABLED") {
            self.log.enabled = parse_env("SLH_LOG_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("SLH_LOG_PATH") {
            self.log.jsonl_path = PathBuf::from(raw);
        }
        Ok(())
    }

    fn normalize_paths(&mut self, home: &Path) {
        self.log.jsonl_path = paths::expand_tilde(&self.log.jsonl_path, home);
        if let Some(fallback) = self.log.fallback_path.as_mut() {
            *fallback = paths::expand_tilde(fallback, home);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.status.validate()?;

        if self.log.enabled {
            if self.log.max_size_bytes == 0 {
                return Err(SlhError::InvalidConfig {
                    details: "log.max_size_bytes must be > 0".to_string(),
                });
            }
            if self.log.max_rotated_files == 0 {
                return Err(SlhError::InvalidConfig {
                    details: "log.max_rotated_files must be >= 1".to_string(),
                });
            }
            if self.log.jsonl_path.as_os_str().is_empty() {
                return Err(SlhError::InvalidConfig {
                    details: "log.jsonl_path must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| SlhError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

//! SLH-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SlhError>;

/// Top-level error type for the status-line helper.
///
/// Collectors report "value unavailable" through the `Err` side of
/// [`Result`]; the renderer turns any such error into the placeholder string.
#[derive(Debug, Error)]
pub enum SlhError {
    #[error("[SLH-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SLH-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SLH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SLH-1004] invalid format template {template:?}: {details}")]
    InvalidFormat { template: String, details: String },

    #[error("[SLH-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[SLH-2001] {collector} unavailable: {details}")]
    Unavailable {
        collector: &'static str,
        details: String,
    },

    #[error("[SLH-2002] {collector} requires an argument")]
    MissingArgument { collector: &'static str },

    #[error("[SLH-2003] failed to parse {source_name}: {details}")]
    ProcParse {
        source_name: &'static str,
        details: String,
    },

    #[error("[SLH-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SLH-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SLH-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SlhError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SLH-1001",
            Self::MissingConfig { .. } => "SLH-1002",
            Self::ConfigParse { .. } => "SLH-1003",
            Self::InvalidFormat { .. } => "SLH-1004",
            Self::UnsupportedPlatform { .. } => "SLH-1101",
            Self::Unavailable { .. } => "SLH-2001",
            Self::MissingArgument { .. } => "SLH-2002",
            Self::ProcParse { .. } => "SLH-2003",
            Self::Serialization { .. } => "SLH-2101",
            Self::Io { .. } => "SLH-3002",
            Self::Runtime { .. } => "SLH-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for a collector that has no value this pass.
    #[must_use]
    pub fn unavailable(collector: &'static str, details: impl Into<String>) -> Self {
        Self::Unavailable {
            collector,
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for SlhError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SlhError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

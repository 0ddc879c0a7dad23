//! Core types: errors, configuration, the status table, shared paths.

pub mod config;
pub mod errors;
pub mod paths;
pub mod table;

//! Turning a status table plus live collectors into one status line.

pub mod line;
pub mod template;

//! Activity logging: JSONL writer and the background logger thread.

pub mod activity;
pub mod jsonl;

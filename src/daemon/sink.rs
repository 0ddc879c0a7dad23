//! Where rendered status lines go.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::errors::{Result, SlhError};

/// Destination for one rendered line per refresh pass.
///
/// A failed publish is fatal for the daemon: once the status bar stops
/// reading, there is nobody left to show lines to.
pub trait StatusSink: Send {
    fn publish(&mut self, line: &str) -> Result<()>;
}

/// Writes each line plus `\n` to a byte stream and flushes it.
pub struct WriteSink<W> {
    writer: W,
    label: &'static str,
}

impl WriteSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), "<stdout>")
    }
}

impl<W: Write + Send> WriteSink<W> {
    /// `label` names the stream in IO errors.
    pub fn new(writer: W, label: &'static str) -> Self {
        Self { writer, label }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> StatusSink for WriteSink<W> {
    fn publish(&mut self, line: &str) -> Result<()> {
        let label = self.label;
        let mut write = || -> io::Result<()> {
            self.writer.write_all(line.as_bytes())?;
            self.writer.write_all(b"\n")?;
            self.writer.flush()
        };
        write().map_err(|source| SlhError::io(label, source))
    }
}

/// Keeps published lines in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }
}

impl StatusSink for MemorySink {
    fn publish(&mut self, line: &str) -> Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_sink_appends_newline() {
        let mut sink = WriteSink::new(Vec::new(), "<buffer>");
        sink.publish(" CPU 3% | 12:00 ").unwrap();
        sink.publish("").unwrap();
        assert_eq!(sink.into_inner(), b" CPU 3% | 12:00 \n\n");
    }

    #[test]
    fn write_failure_is_io_error_naming_stream() {
        let mut sink = WriteSink::new(BrokenPipe, "<stdout>");
        let err = sink.publish("x").expect_err("broken pipe");
        assert_eq!(err.code(), "SLH-3002");
        assert!(err.to_string().contains("<stdout>"));
    }

    #[test]
    fn memory_sink_clones_share_lines() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.publish("a").unwrap();
        writer.publish("b").unwrap();
        assert_eq!(sink.lines(), ["a", "b"]);
        assert_eq!(sink.last().as_deref(), Some("b"));
    }
}

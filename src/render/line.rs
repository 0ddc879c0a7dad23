//! Status-line composition.
//!
//! Records are visited in table order. Each collector's value (or the
//! placeholder when it has none) is expanded into the record's template and
//! appended to a buffer bounded by the table's `max_len`. Overflow cuts the
//! text at a character boundary and ends the pass, like `snprintf` into a
//! fixed buffer followed by a bail-out.

use crate::collectors::{CollectorKind, CollectorRegistry};
use crate::core::errors::SlhError;
use crate::core::table::StatusTable;
use crate::render::template;

/// A record whose collector had no value this pass.
#[derive(Debug)]
pub struct RecordFailure {
    pub index: usize,
    pub collector: CollectorKind,
    pub error: SlhError,
}

/// Output of one render pass.
#[derive(Debug, Default)]
pub struct RenderedLine {
    pub text: String,
    /// The buffer bound cut the line short.
    pub truncated: bool,
    /// Records whose collector ran; a truncated pass stops early.
    pub rendered: usize,
    pub failures: Vec<RecordFailure>,
}

impl RenderedLine {
    /// Whether the collector at `index` had no value this pass.
    pub fn failed(&self, index: usize) -> bool {
        self.failures.iter().any(|failure| failure.index == index)
    }
}

/// Render `table` once using `collectors`.
///
/// The text never exceeds `max_len - 1` bytes; one byte of the bound is the
/// terminator slot of the buffer it replaces.
pub fn render<R>(table: &StatusTable, collectors: &R) -> RenderedLine
where
    R: CollectorRegistry + ?Sized,
{
    let capacity = table.max_len().saturating_sub(1);
    let mut line = RenderedLine {
        text: String::with_capacity(capacity.min(4096)),
        ..RenderedLine::default()
    };
    let mut piece = String::new();

    for (index, record) in table.args().iter().enumerate() {
        let kind = record.collector();
        line.rendered = index + 1;
        piece.clear();
        match collectors.collector(kind).collect(record.argument()) {
            Ok(value) => template::expand_into(record.format(), &value, &mut piece),
            Err(error) => {
                template::expand_into(record.format(), table.unknown_str(), &mut piece);
                line.failures.push(RecordFailure {
                    index,
                    collector: kind,
                    error,
                });
            }
        }

        let room = capacity - line.text.len();
        if piece.len() > room {
            line.text.push_str(truncate_at_boundary(&piece, room));
            line.truncated = true;
            break;
        }
        line.text.push_str(&piece);
    }

    line
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a
/// character.
fn truncate_at_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

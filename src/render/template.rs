//! Format templates: printf-style strings with exactly one `%s` slot.
//!
//! `%%` is a literal percent sign. Nothing else after a `%` is accepted,
//! so a template can never ask for a second value or a numeric conversion.

use crate::core::errors::{Result, SlhError};

const SLOT: char = 's';
const ESCAPE: char = '%';

/// Check that `template` has exactly one `%s` and no other conversions.
pub fn validate(template: &str) -> Result<()> {
    let mut slots = 0_usize;
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            continue;
        }
        match chars.next() {
            Some(SLOT) => slots += 1,
            Some(ESCAPE) => {}
            Some(other) => {
                return Err(invalid(template, format!("unsupported conversion %{other}")));
            }
            None => return Err(invalid(template, "trailing '%'".to_string())),
        }
    }

    match slots {
        1 => Ok(()),
        0 => Err(invalid(template, "no %s slot".to_string())),
        n => Err(invalid(template, format!("{n} %s slots, expected exactly one"))),
    }
}

/// Append the expansion of `template` with `value` in its slot to `out`.
///
/// Templates are validated when a table is built; an unexpected sequence here
/// is copied through verbatim.
pub fn expand_into(template: &str, value: &str, out: &mut String) {
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(SLOT) => out.push_str(value),
            Some(ESCAPE) => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
}

/// Expansion of `template` as a fresh string.
pub fn expand(template: &str, value: &str) -> String {
    let mut out = String::with_capacity(template.len() + value.len());
    expand_into(template, value, &mut out);
    out
}

fn invalid(template: &str, details: String) -> SlhError {
    SlhError::InvalidFormat {
        template: template.to_string(),
        details,
    }
}

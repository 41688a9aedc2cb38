//! XML Entity Resolution
//!
//! Handles the two directions of entity text:
//! - Resolving references the tokenizer hands over as bare names
//!   (`lt`, `#65`, `#x1F600`) into their literal characters
//! - Escaping literal text for serialized output
//!
//! Uses Cow for zero-copy when no escaping is needed.

use std::borrow::Cow;

use memchr::{memchr2, memchr3};

/// Resolve an entity name (without `&` and `;`) to its character.
///
/// Covers the named set `amp apos gt lt nbsp quot` plus numeric references
/// `#NNN` and `#xHHHH`. Returns `None` for anything else; the caller decides
/// whether to pass the reference through literally.
pub fn resolve(name: &str) -> Option<char> {
    if let Some(reference) = name.strip_prefix('#') {
        return resolve_numeric(reference);
    }
    match name {
        "amp" => Some('&'),
        "apos" => Some('\''),
        "gt" => Some('>'),
        "lt" => Some('<'),
        "nbsp" => Some('\u{00A0}'),
        "quot" => Some('"'),
        _ => None,
    }
}

/// Decode a numeric character reference (decimal, or hex after `x`/`X`).
fn resolve_numeric(reference: &str) -> Option<char> {
    let code = if let Some(hex) = reference.strip_prefix(['x', 'X']) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        reference.parse::<u32>().ok()?
    };
    char::from_u32(code)
}

/// Escape text for XML output.
///
/// Returns Borrowed when nothing needs escaping (zero-copy).
pub fn escape(input: &str) -> Cow<'_, str> {
    if !needs_escape(input) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    escape_into(input, &mut out);
    Cow::Owned(out)
}

/// Escape text into an existing output buffer.
pub(crate) fn escape_into(input: &str, buf: &mut String) {
    if !needs_escape(input) {
        buf.push_str(input);
        return;
    }
    for c in input.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&apos;"),
            _ => buf.push(c),
        }
    }
}

/// Fast path: locate any character that would need escaping.
#[inline]
fn needs_escape(input: &str) -> bool {
    let bytes = input.as_bytes();
    memchr3(b'&', b'<', b'>', bytes).is_some() || memchr2(b'"', b'\'', bytes).is_some()
}

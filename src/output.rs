//! Presentation of captured bytes for the command-line front end.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Render `bytes` as a double-quoted literal with control characters and
/// invalid UTF-8 escaped, e.g. `"Password: \r\n"`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for chunk in bytes.utf8_chunks() {
        for ch in chunk.valid().chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\x07' => out.push_str("\\a"),
                '\x08' => out.push_str("\\b"),
                '\x0b' => out.push_str("\\v"),
                '\x0c' => out.push_str("\\f"),
                c if c.is_control() && (c as u32) < 0x80 => {
                    let _ = write!(out, "\\x{:02x}", c as u32);
                }
                c if c.is_control() => {
                    let _ = write!(out, "\\u{:04x}", c as u32);
                }
                c => out.push(c),
            }
        }
        for byte in chunk.invalid() {
            let _ = write!(out, "\\x{byte:02x}");
        }
    }
    out.push('"');
    out
}

/// The bytes to print, escaped or untouched.
pub fn render(bytes: &[u8], escape: bool) -> Cow<'_, [u8]> {
    if escape {
        Cow::Owned(escape_bytes(bytes).into_bytes())
    } else {
        Cow::Borrowed(bytes)
    }
}

/// Write one captured stream. Nothing is written for an empty capture.
pub fn write_captured<W: Write>(out: &mut W, bytes: &[u8], escape: bool) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    out.write_all(&render(bytes, escape))?;
    out.flush()
}

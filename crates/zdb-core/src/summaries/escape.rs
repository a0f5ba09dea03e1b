//! Byte-string escaping for target memory shown as Zig string literals.

use std::fmt::Write;

/// Append `bytes` to `out` with Zig-style escapes.
///
/// `"` `\` `\n` `\r` `\t` get their short escapes; any other byte outside
/// printable ASCII becomes `\xHH`.
pub fn escape_bytes(out: &mut String, bytes: &[u8])
{
    for &byte in bytes {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            32..=126 => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "\\x{byte:02x}");
            }
        }
    }
}

/// `bytes` escaped and wrapped in double quotes.
pub fn quote_bytes(bytes: &[u8]) -> String
{
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    escape_bytes(&mut out, bytes);
    out.push('"');
    out
}

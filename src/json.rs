//! Shared JSON output format.
//!
//! Every document this crate writes (`topik{N}.json`, `manifest.json`) uses
//! the same layout: UTF-8, non-ASCII left unescaped, one-space indentation,
//! no trailing newline. Consumers diff these files, so the layout is fixed.

use serde::Serialize;

/// Serialise `value` as a pretty-printed document with one-space indents.
pub fn to_pretty_bytes<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(out)
}

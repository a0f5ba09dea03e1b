//! Renderers for Zig language types (as opposed to std containers).

use std::fmt::Write;

use super::{C_STRING_BUFFER, MAX_STRING_LEN, quote_bytes};
use crate::value::{ValueHandle, display_text, error_tag};

/// Structs with at most this many children are shown inline.
const INLINE_FIELDS: u32 = 3;

fn slice_parts<V: ValueHandle>(value: &V) -> Option<(u64, u64)>
{
    let len = value.child_member("len")?;
    let ptr = value.child_member("ptr")?;
    Some((len.value_as_unsigned(), ptr.value_as_unsigned()))
}

fn slice_text(len: u64, ptr: u64) -> String
{
    format!("len={len} ptr=0x{ptr:x}")
}

pub(super) fn slice<V: ValueHandle>(value: &V) -> Option<String>
{
    slice_parts(value).map(|(len, ptr)| slice_text(len, ptr))
}

pub(super) fn string<V: ValueHandle>(value: &V) -> Option<String>
{
    let (len, ptr) = slice_parts(value)?;

    if len > 0 && len < MAX_STRING_LEN && ptr != 0 {
        // len < MAX_STRING_LEN, so the cast cannot truncate.
        if let Some(bytes) = value.read_memory(ptr, len as usize) {
            return Some(quote_bytes(&bytes));
        }
    }

    Some(slice_text(len, ptr))
}

pub(super) fn optional<V: ValueHandle>(value: &V) -> String
{
    const PRESENT: &str = "(has value)";

    if let Some(some) = value.child_member("some") {
        if some.value_as_unsigned() == 0 {
            return String::from("null");
        }
        return value
            .child_member("data")
            .and_then(|data| display_text(&data))
            .unwrap_or_else(|| String::from(PRESENT));
    }

    // Older compilers: a single child that is either the payload or `null`.
    let Some(child) = value.child_at_index(0) else {
        return String::from("null");
    };
    if child.name().as_deref() == Some("null") {
        return String::from("null");
    }
    display_text(&child).unwrap_or_else(|| String::from(PRESENT))
}

pub(super) fn error_union<V: ValueHandle>(value: &V) -> Option<String>
{
    let tag = error_tag(value)?;

    let code = tag.value_as_unsigned();
    if code != 0 {
        return Some(match tag.value() {
            Some(name) => format!("error.{name}"),
            None => format!("error({code})"),
        });
    }

    Some(
        value
            .child_member("value")
            .and_then(|payload| display_text(&payload))
            .unwrap_or_else(|| String::from("(success)")),
    )
}

pub(super) fn tagged_union<V: ValueHandle>(value: &V) -> Option<String>
{
    let tag = value.child_member("tag")?.value()?;
    let mut out = format!(".{tag}");

    let active = value.child_member("payload").and_then(|payload| payload.child_member(&tag));
    if let Some(summary) = active.and_then(|active| active.summary()) {
        let _ = write!(out, " = {summary}");
    }

    Some(out)
}

pub(super) fn pointer<V: ValueHandle>(value: &V) -> String
{
    let address = value.value_as_unsigned();
    if address == 0 {
        return String::from("null");
    }

    match value.dereference().and_then(|pointee| display_text(&pointee)) {
        Some(text) => format!("-> {text}"),
        None => format!("0x{address:x}"),
    }
}

pub(super) fn c_string<V: ValueHandle>(value: &V) -> String
{
    let address = value.value_as_unsigned();
    if address == 0 {
        return String::from("null");
    }

    match value.read_c_string(address, C_STRING_BUFFER) {
        Some(bytes) => quote_bytes(&bytes),
        None => format!("0x{address:x}"),
    }
}

pub(super) fn array<V: ValueHandle>(value: &V) -> String
{
    format!("[{}]...", value.num_children())
}

pub(super) fn structure<V: ValueHandle>(value: &V) -> String
{
    let count = value.num_children();

    if count == 0 {
        return match value.value() {
            Some(case) => format!(".{case}"),
            None => String::from("{}"),
        };
    }

    if count > INLINE_FIELDS {
        return format!("{{ {count} fields }}");
    }

    let fields: Vec<String> = (0..count)
        .filter_map(|index| value.child_at_index(index))
        .filter_map(|child| {
            let text = display_text(&child)?;
            let name = child.name().unwrap_or_else(|| String::from("?"));
            Some(format!(".{name}={text}"))
        })
        .collect();

    if fields.is_empty() {
        return String::from("{}");
    }
    format!("{{ {} }}", fields.join(", "))
}

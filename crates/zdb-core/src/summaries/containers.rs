//! Renderers for `std` containers.
//!
//! Container layouts change between Zig releases more often than language
//! types do, so every renderer here succeeds: when the expected children are
//! missing it prints the container name in parentheses instead.

use crate::value::{ValueHandle, is_slice};

fn length<V: ValueHandle>(value: &V) -> Option<u64>
{
    value.child_member("len").map(|len| len.value_as_unsigned())
}

fn with_capacity<V: ValueHandle>(value: &V, len: u64) -> String
{
    match value.child_member("capacity") {
        Some(capacity) => format!("len={len} capacity={}", capacity.value_as_unsigned()),
        None => format!("len={len}"),
    }
}

/// `std.ArrayList`: length comes from the `items` slice.
pub(super) fn array_list<V: ValueHandle>(value: &V) -> String
{
    match value.child_member("items").filter(is_slice).and_then(|items| length(&items)) {
        Some(len) => with_capacity(value, len),
        None => String::from("(ArrayList)"),
    }
}

/// `std.HashMap`: unmanaged maps call it `size`, older ones `count`.
pub(super) fn hash_map<V: ValueHandle>(value: &V) -> String
{
    match value.child_member("size").or_else(|| value.child_member("count")) {
        Some(size) => format!("size={}", size.value_as_unsigned()),
        None => String::from("(HashMap)"),
    }
}

pub(super) fn multi_array_list<V: ValueHandle>(value: &V) -> String
{
    match length(value) {
        Some(len) => with_capacity(value, len),
        None => String::from("(MultiArrayList)"),
    }
}

/// Containers that only expose a length.
pub(super) fn length_only<V: ValueHandle>(value: &V, container: &str) -> String
{
    match length(value) {
        Some(len) => format!("len={len}"),
        None => format!("({container})"),
    }
}

//! # Value Handles and Zig Shapes
//!
//! The read-only view of a debugger value that summaries and the rewriter
//! work against, plus the structural checks that tell Zig kinds apart.
//!
//! Zig's debug info does not say "this is a slice". The checks below recognize
//! kinds by the children the Zig compiler emits:
//!
//! | Kind          | Children                                  |
//! |---------------|-------------------------------------------|
//! | slice         | `ptr`, `len`                              |
//! | dynamic array | `items` (a slice), `capacity`             |
//! | optional      | `some` (discriminant), `data` (payload)   |
//! | error union   | `tag` (or `error` / `err`), `value`       |
//!
//! These are contracts on compiler output, not declarations, so every check
//! is a best effort that answers `false` when unsure.

/// A value inside the debugged process.
///
/// Every accessor is read-only; nothing here may resume the inferior.
/// Optional results are `None` when the host reports an invalid value or an
/// empty string.
pub trait ValueHandle: Sized
{
    /// Child with the given member name.
    fn child_member(&self, name: &str) -> Option<Self>;

    /// Child at `index`.
    fn child_at_index(&self, index: u32) -> Option<Self>;

    fn num_children(&self) -> u32;

    /// Member or variable name.
    fn name(&self) -> Option<String>;

    /// Value text as LLDB formats it (`"42"`, `"OutOfMemory"`).
    fn value(&self) -> Option<String>;

    /// Summary text, if a formatter produced a non-empty one.
    fn summary(&self) -> Option<String>;

    /// The value read as an unsigned integer, `0` on failure.
    fn value_as_unsigned(&self) -> u64;

    fn type_name(&self) -> Option<String>;

    /// Whether the value's type is a pointer type.
    fn is_pointer(&self) -> bool;

    /// The pointee, for pointer values.
    fn dereference(&self) -> Option<Self>;

    /// Read exactly `len` bytes at `address` from the value's process.
    fn read_memory(&self, address: u64, len: usize) -> Option<Vec<u8>>;

    /// Read a NUL-terminated string of at most `max_len` bytes (NUL included).
    ///
    /// The returned bytes exclude the terminator. An empty read is `None`.
    fn read_c_string(&self, address: u64, max_len: usize) -> Option<Vec<u8>>;
}

fn has_children<V: ValueHandle>(value: &V, names: &[&str]) -> bool
{
    names.iter().all(|name| value.child_member(name).is_some())
}

/// `{ ptr, len }`
pub fn is_slice<V: ValueHandle>(value: &V) -> bool
{
    has_children(value, &["ptr", "len"])
}

/// `{ items: []T, capacity }` (std.ArrayList and friends)
pub fn is_dynamic_array<V: ValueHandle>(value: &V) -> bool
{
    value.child_member("capacity").is_some() && value.child_member("items").is_some_and(|items| is_slice(&items))
}

/// `{ some, data }`
pub fn is_optional<V: ValueHandle>(value: &V) -> bool
{
    has_children(value, &["some", "data"])
}

/// `{ tag, value }`
///
/// Only the current layout counts here. Summaries additionally accept the
/// older tag names through [`error_tag`].
pub fn is_error_union<V: ValueHandle>(value: &V) -> bool
{
    has_children(value, &["tag", "value"])
}

/// The error-union discriminant: `tag`, or `error` / `err` on older compilers.
pub fn error_tag<V: ValueHandle>(value: &V) -> Option<V>
{
    ["tag", "error", "err"].iter().find_map(|name| value.child_member(name))
}

/// Summary text if present, else value text.
pub fn display_text<V: ValueHandle>(value: &V) -> Option<String>
{
    value.summary().or_else(|| value.value())
}

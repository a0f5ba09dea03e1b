//! # Zig Summaries
//!
//! One-line renderings of Zig values, as shown by `frame variable` and `p`.
//!
//! Each [`SummaryKind`] maps to one rendering function. Renderers only read
//! children and process memory through [`ValueHandle`]; they never evaluate
//! expressions, so they are safe in contexts where the inferior must not run.
//!
//! A renderer returns `None` when the value does not have the shape it expects.
//! The host then falls back to its default presentation.
//!
//! ## Example Output
//!
//! ```text
//! []i32            len=3 ptr=0x1000
//! []const u8       "hello"
//! ?i32             null | 42
//! error{Oom}!i32   error.OutOfMemory | 7
//! union(enum)      .int = 5
//! array_list.*     len=4 capacity=8
//! [*:0]const u8    "argv0"
//! ```

mod containers;
mod escape;
mod primitives;

pub use escape::{escape_bytes, quote_bytes};

use crate::value::ValueHandle;

/// Longest string slice read from the target.
pub const MAX_STRING_LEN: u64 = 1024;

/// Buffer size for C string reads (terminator included).
pub const C_STRING_BUFFER: usize = 256;

/// The closed set of Zig renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryKind
{
    /// Structs and enums: `{ .a=1, .b=2 }`, `.red`
    Struct,
    /// Fixed-size arrays: `[4]...`
    Array,
    /// `[]T`: `len=3 ptr=0x1000`
    Slice,
    /// `[]u8` / `[]const u8`: `"hello"`
    String,
    /// `?T`
    Optional,
    /// `E!T`
    ErrorUnion,
    /// `union(enum)`
    TaggedUnion,
    /// `*T`, `[*]T`, `[*:s]T`
    Pointer,
    /// `std.ArrayList`
    ArrayList,
    /// `std.HashMap`
    HashMap,
    /// `std.BoundedArray`
    BoundedArray,
    /// `std.MultiArrayList`
    MultiArrayList,
    /// `std.SegmentedList`
    SegmentedList,
    /// `[*:0]u8` / `[*:0]const u8`
    CString,
}

impl SummaryKind
{
    pub const ALL: [SummaryKind; 14] = [
        SummaryKind::Struct,
        SummaryKind::Array,
        SummaryKind::Slice,
        SummaryKind::String,
        SummaryKind::Optional,
        SummaryKind::ErrorUnion,
        SummaryKind::TaggedUnion,
        SummaryKind::Pointer,
        SummaryKind::ArrayList,
        SummaryKind::HashMap,
        SummaryKind::BoundedArray,
        SummaryKind::MultiArrayList,
        SummaryKind::SegmentedList,
        SummaryKind::CString,
    ];

    /// Render `value` as this kind.
    pub fn render<V: ValueHandle>(self, value: &V) -> Option<String>
    {
        match self {
            SummaryKind::Struct => Some(primitives::structure(value)),
            SummaryKind::Array => Some(primitives::array(value)),
            SummaryKind::Slice => primitives::slice(value),
            SummaryKind::String => primitives::string(value),
            SummaryKind::Optional => Some(primitives::optional(value)),
            SummaryKind::ErrorUnion => primitives::error_union(value),
            SummaryKind::TaggedUnion => primitives::tagged_union(value),
            SummaryKind::Pointer => Some(primitives::pointer(value)),
            SummaryKind::ArrayList => Some(containers::array_list(value)),
            SummaryKind::HashMap => Some(containers::hash_map(value)),
            SummaryKind::BoundedArray => Some(containers::length_only(value, "BoundedArray")),
            SummaryKind::MultiArrayList => Some(containers::multi_array_list(value)),
            SummaryKind::SegmentedList => Some(containers::length_only(value, "SegmentedList")),
            SummaryKind::CString => Some(primitives::c_string(value)),
        }
    }

    /// Short name used in logs.
    pub fn label(self) -> &'static str
    {
        match self {
            SummaryKind::Struct => "struct",
            SummaryKind::Array => "array",
            SummaryKind::Slice => "slice",
            SummaryKind::String => "string",
            SummaryKind::Optional => "optional",
            SummaryKind::ErrorUnion => "error union",
            SummaryKind::TaggedUnion => "tagged union",
            SummaryKind::Pointer => "pointer",
            SummaryKind::ArrayList => "ArrayList",
            SummaryKind::HashMap => "HashMap",
            SummaryKind::BoundedArray => "BoundedArray",
            SummaryKind::MultiArrayList => "MultiArrayList",
            SummaryKind::SegmentedList => "SegmentedList",
            SummaryKind::CString => "C string",
        }
    }
}

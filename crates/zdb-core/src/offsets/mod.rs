//! # Offset Tables
//!
//! Versioned records of where LLDB's private formatter entry points live.
//!
//! LLDB does not export `DataVisualization::Categories::GetCategory` and
//! friends, so their addresses are recorded per build as offsets from the
//! library's load base. One exported symbol (the *reference symbol*) is
//! recorded as well: resolving it at runtime tells us where the base is.
//!
//! ## File Format
//!
//! Tables are JSON-shaped text produced by `tools/dump_offsets.py`:
//!
//! ```text
//! {
//!   "version": "21.1.7",
//!   "reference_symbol": "_ZN4lldb10SBDebugger10InitializeEv",
//!   "reference_offset": "0x001abcd0",
//!   "DataVisualization::Categories::GetCategory": { "offset": "0x002f1040" },
//!   "DataVisualization::Categories::Enable":      { "offset": "0x002f1120" },
//!   "TypeCategoryImpl::AddTypeSummary":           { "offset": "0x00344ab0" }
//! }
//! ```
//!
//! The scanner only looks for the keys it knows. Unknown keys, extra fields
//! inside an entry (`mangled`, `relative`) and a wrapping `"symbols"` object
//! are all ignored. A key that is missing, `null`, or carries text that is not
//! hexadecimal means "entry point unavailable" and is never an error.

pub mod loader;

use std::fmt;

pub use loader::{HostVersion, ResolvedSymbols, SearchSource, SymbolResolver, TableCandidate};

/// Reference symbol used when a table leaves `reference_symbol` empty.
///
/// `lldb::SBDebugger::Initialize()` is part of the public API, so every
/// liblldb build exports it.
pub const DEFAULT_REFERENCE_SYMBOL: &str = "_ZN4lldb10SBDebugger10InitializeEv";

/// The closed set of private entry points zdb calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint
{
    /// `DataVisualization::Categories::GetCategory(ConstString, TypeCategoryImplSP&, bool)`
    GetCategory,
    /// `DataVisualization::Categories::Enable(const TypeCategoryImplSP&, uint32_t)`
    EnableCategory,
    /// `TypeCategoryImpl::AddTypeSummary(StringRef, FormatterMatchType, TypeSummaryImplSP)`
    AddTypeSummary,
}

impl EntryPoint
{
    /// Every entry point, in table order.
    pub const ALL: [EntryPoint; 3] = [EntryPoint::GetCategory, EntryPoint::EnableCategory, EntryPoint::AddTypeSummary];

    /// Key under which the entry point is recorded in a table.
    pub const fn table_key(self) -> &'static str
    {
        match self {
            EntryPoint::GetCategory => "DataVisualization::Categories::GetCategory",
            EntryPoint::EnableCategory => "DataVisualization::Categories::Enable",
            EntryPoint::AddTypeSummary => "TypeCategoryImpl::AddTypeSummary",
        }
    }

    /// Length-prefixed method name as it appears inside the mangled symbol.
    ///
    /// The standard library namespace in the mangled parameter list differs
    /// between libc++ and libstdc++ builds, so verification matches on this
    /// fragment rather than on the full mangled name.
    pub const fn mangled_method(self) -> &'static str
    {
        match self {
            EntryPoint::GetCategory => "10Categories11GetCategory",
            EntryPoint::EnableCategory => "10Categories6Enable",
            EntryPoint::AddTypeSummary => "16TypeCategoryImpl14AddTypeSummary",
        }
    }

    /// Whether registration can proceed without this entry point.
    ///
    /// Enabling the category is optional: a category that was created but not
    /// enabled can still be turned on with `type category enable zig`.
    pub const fn is_required(self) -> bool
    {
        !matches!(self, EntryPoint::EnableCategory)
    }

    const fn index(self) -> usize
    {
        match self {
            EntryPoint::GetCategory => 0,
            EntryPoint::EnableCategory => 1,
            EntryPoint::AddTypeSummary => 2,
        }
    }
}

impl fmt::Display for EntryPoint
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.table_key())
    }
}

/// A parsed offset table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable
{
    /// LLDB version the table was dumped from
    pub version: String,
    /// Exported symbol used to find the load base (may be empty)
    pub reference_symbol: String,
    /// Offset of the reference symbol from the load base (0 = unusable)
    pub reference_offset: u64,
    offsets: [Option<u64>; 3],
}

impl OffsetTable
{
    /// Scan table text for the known keys.
    ///
    /// Never fails: anything that can't be read is simply absent. Use
    /// [`OffsetTable::is_usable`] to decide whether the result can be resolved.
    #[must_use]
    pub fn parse(text: &str) -> Self
    {
        let mut offsets = [None; 3];
        for entry in EntryPoint::ALL {
            offsets[entry.index()] = entry_offset(text, entry.table_key());
        }

        Self {
            version: string_value(text, "version").unwrap_or_default(),
            reference_symbol: string_value(text, "reference_symbol").unwrap_or_default(),
            reference_offset: hex_value(text, "reference_offset").unwrap_or(0),
            offsets,
        }
    }

    /// Offset of an entry point, if the table records one.
    pub fn offset(&self, entry: EntryPoint) -> Option<u64>
    {
        self.offsets[entry.index()]
    }

    /// Record (or clear) an entry point offset.
    pub fn set_offset(&mut self, entry: EntryPoint, offset: Option<u64>)
    {
        self.offsets[entry.index()] = offset.filter(|value| *value != 0);
    }

    /// A table can be resolved only if it knows where its reference symbol is.
    pub fn is_usable(&self) -> bool
    {
        self.reference_offset != 0
    }

    /// The reference symbol to look up, falling back to the default.
    pub fn reference_symbol(&self) -> &str
    {
        if self.reference_symbol.is_empty() {
            DEFAULT_REFERENCE_SYMBOL
        } else {
            &self.reference_symbol
        }
    }
}

/// Parse `0x`-prefixed (or bare) hexadecimal. Zero counts as absent.
pub fn parse_hex(text: &str) -> Option<u64>
{
    let digits = text
        .trim()
        .strip_prefix("0x")
        .or_else(|| text.trim().strip_prefix("0X"))
        .unwrap_or(text.trim());
    u64::from_str_radix(digits, 16).ok().filter(|value| *value != 0)
}

/// Find the text following `"key"` and its colon.
///
/// A quoted key that is not followed by a colon (for example the same text
/// used as a value) is skipped and the search continues.
fn value_after_key<'a>(text: &'a str, key: &str) -> Option<&'a str>
{
    let needle = format!("\"{key}\"");
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find(&needle) {
        let after_key = search_from + found + needle.len();
        let rest = text[after_key..].trim_start();
        if let Some(value) = rest.strip_prefix(':') {
            return Some(value.trim_start());
        }
        search_from = after_key;
    }

    None
}

fn quoted(value: &str) -> Option<&str>
{
    let inner = value.strip_prefix('"')?;
    let end = inner.find('"')?;
    Some(&inner[..end])
}

fn string_value(text: &str, key: &str) -> Option<String>
{
    value_after_key(text, key).and_then(quoted).map(str::to_string)
}

fn hex_value(text: &str, key: &str) -> Option<u64>
{
    value_after_key(text, key).and_then(quoted).and_then(parse_hex)
}

/// The `{ ... }` block recorded under `key`, without the braces.
///
/// `null` or any other non-object value yields `None`, so an absent entry
/// never picks up the offset of the entry after it.
fn object_value<'a>(text: &'a str, key: &str) -> Option<&'a str>
{
    let value = value_after_key(text, key)?;
    let body = value.strip_prefix('{')?;

    let mut depth = 1usize;
    for (index, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[..index]);
                }
            }
            _ => {}
        }
    }

    None
}

fn entry_offset(text: &str, key: &str) -> Option<u64>
{
    object_value(text, key).and_then(|block| hex_value(block, "offset"))
}

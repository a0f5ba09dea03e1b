//! # Formatter Registration
//!
//! The load-time sequence that puts Zig summaries into LLDB's `zig` category.
//!
//! ## Sequence
//!
//! 1. Read the host version (`lldb version 21.1.7` -> `21.1.7`)
//! 2. Resolve the host library path
//! 3. Load the offset table and check the required entry points
//! 4. Take typed pointers at `base + offset` ([`PrivateEntryPoints`](crate::abi::PrivateEntryPoints))
//! 5. Look up (or create) the `zig` category
//! 6. Create one callback summary per pattern and add it with regex matching
//! 7. Enable the category at position 0, if the table knows how
//!
//! Step 2 is [`loader::resolve_library_path`], steps 1 and 3 are
//! [`resolve_host`], steps 5-7 are [`install_formatters`]. Any
//! error before step 6 aborts registration. In step 6 a pattern whose summary
//! cannot be created is skipped and the rest still install.
//!
//! ## Pattern Order
//!
//! LLDB's match engine picks the most recently added matching pattern, so
//! [`PATTERNS`] runs from broadest to narrowest: `[]u8` is added after `[].*`
//! and therefore wins for byte slices.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::abi::surgery::{SummaryFactory, SummaryRegistry};
use crate::abi::{CategoryApi, MatchType};
use crate::config::PluginConfig;
use crate::error::{Result, ZdbError};
use crate::offsets::loader;
use crate::offsets::{EntryPoint, HostVersion, ResolvedSymbols, SymbolResolver};
use crate::summaries::SummaryKind;

/// Name of the LLDB type category the summaries are installed into.
pub const CATEGORY_NAME: &str = "zig";

/// One type-name pattern and the summary it gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatterPattern
{
    /// Regular expression matched against the type name
    pub pattern: &'static str,
    /// Rendering installed for matching types
    pub kind: SummaryKind,
    /// Description stored with the summary (shown by `type summary list`)
    pub description: &'static str,
}

const fn pattern(pattern: &'static str, kind: SummaryKind, description: &'static str) -> FormatterPattern
{
    FormatterPattern { pattern, kind, description }
}

/// Every pattern, in registration order (broadest first).
pub const PATTERNS: &[FormatterPattern] = &[
    // Structs and enums
    pattern(r"^[a-z_][a-z0-9_]*\.[A-Z][A-Za-z0-9_]*$", SummaryKind::Struct, "Zig struct/enum"),
    pattern(r"^[A-Z][A-Za-z0-9_]*$", SummaryKind::Struct, "Zig type"),
    // Type operators
    pattern(r"^\[.*\].*$", SummaryKind::Array, "Zig array"),
    pattern(r"^\[\].*$", SummaryKind::Slice, "Zig slice"),
    pattern(r"^\?.*$", SummaryKind::Optional, "Zig optional"),
    pattern(r"^.*!.*$", SummaryKind::ErrorUnion, "Zig error union"),
    pattern(r"^union\(.*\)$", SummaryKind::TaggedUnion, "Zig tagged union"),
    pattern(r"^\*.*$", SummaryKind::Pointer, "Zig pointer"),
    pattern(r"^\[\*\].*$", SummaryKind::Pointer, "Zig many pointer"),
    pattern(r"^\[\*:.*\].*$", SummaryKind::Pointer, "Zig sentinel pointer"),
    // std containers
    pattern(r"^array_list\..*$", SummaryKind::ArrayList, "Zig ArrayList"),
    pattern(r"^hash_map\..*$", SummaryKind::HashMap, "Zig HashMap"),
    pattern(r"^bounded_array\..*$", SummaryKind::BoundedArray, "Zig BoundedArray"),
    pattern(r"^multi_array_list\..*$", SummaryKind::MultiArrayList, "Zig MultiArrayList"),
    pattern(r"^segmented_list\..*$", SummaryKind::SegmentedList, "Zig SegmentedList"),
    // C strings
    pattern(r"^\[\*:0\]u8$", SummaryKind::CString, "Zig C string"),
    pattern(r"^\[\*:0\]const u8$", SummaryKind::CString, "Zig const C string"),
    // Byte-slice strings
    pattern(r"^\[\]const u8$", SummaryKind::String, "Zig const string"),
    pattern(r"^\[\]u8$", SummaryKind::String, "Zig string"),
];

/// Outcome of [`install_formatters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration
{
    /// Patterns added to the category
    pub installed: usize,
    /// Patterns whose summary could not be created
    pub skipped: Vec<&'static str>,
    /// Whether the category was enabled
    pub enabled: bool,
}

/// Steps 1 and 3: parse the host version, then load and resolve its offset table.
///
/// The caller has already found the host library (step 2, see
/// [`loader::resolve_library_path`]) and opened it as `resolver`, since the
/// version string itself comes from a symbol in that library.
pub fn resolve_host<R>(config: &PluginConfig, version_string: &str, library_path: &Path, resolver: &R) -> Result<ResolvedSymbols>
where
    R: SymbolResolver + ?Sized,
{
    let version = HostVersion::parse(version_string)?;
    debug!(%version, library = %library_path.display(), "host LLDB version");

    let symbols = loader::load(config, &version, library_path, resolver)?;
    require_entry_points(&symbols)?;

    Ok(symbols)
}

/// Fail unless every required entry point resolved.
pub fn require_entry_points(symbols: &ResolvedSymbols) -> Result<()>
{
    for entry in EntryPoint::ALL.into_iter().filter(|entry| entry.is_required()) {
        symbols.require(entry)?;
    }

    if symbols.address(EntryPoint::EnableCategory).is_none() {
        debug!("offset table has no Enable entry; category will not be enabled automatically");
    }
    Ok(())
}

/// Steps 5-7: acquire the category, add every pattern, enable the category.
///
/// Wrappers created along the way are kept in `registry`, which must outlive
/// the category (in the plugin it is leaked).
pub fn install_formatters<A, F>(api: &A, factory: &F, registry: &mut SummaryRegistry<F::Wrapper>) -> Result<Registration>
where
    A: CategoryApi + ?Sized,
    F: SummaryFactory + ?Sized,
{
    for entry in [EntryPoint::GetCategory, EntryPoint::AddTypeSummary] {
        if !api.supports(entry) {
            return Err(ZdbError::EntryPointMissing(entry));
        }
    }

    let category = api.get_category(CATEGORY_NAME, true)?;
    if category.is_empty() {
        return Err(ZdbError::CategoryUnavailable(CATEGORY_NAME.to_string()));
    }

    let mut outcome = Registration::default();
    for entry in PATTERNS {
        let handle = factory.create(entry.kind, entry.description).and_then(|wrapper| registry.adopt(wrapper));
        let Some(handle) = handle else {
            let error = ZdbError::SummaryCreationFailed { pattern: entry.pattern };
            warn!(%error, "skipping pattern");
            outcome.skipped.push(entry.pattern);
            continue;
        };

        api.add_type_summary(&category, entry.pattern, MatchType::Regex, handle)?;
        outcome.installed += 1;
    }

    if api.supports(EntryPoint::EnableCategory) {
        api.enable_category(&category, 0)?;
        outcome.enabled = true;
    }

    info!(installed = outcome.installed, skipped = outcome.skipped.len(), enabled = outcome.enabled, "zig formatters registered");
    Ok(outcome)
}

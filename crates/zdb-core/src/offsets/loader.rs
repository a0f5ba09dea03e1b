//! # Table Loader
//!
//! Picks the offset table for the running LLDB and resolves it against the
//! host library's load base.
//!
//! ## Discovery Order
//!
//! The first hit wins:
//!
//! 1. `$ZDB_OFFSETS_FILE` (taken as-is, even if it does not exist)
//! 2. `$ZDB_OFFSETS_DIR/lldb-<version>.json`
//! 3. `$HOME/.config/zdb/offsets/lldb-<version>.json`
//! 4. `/usr/local/share/zdb/offsets/lldb-<version>.json`
//! 5. `<plugin dir>/../offsets/lldb-<version>.json`
//!
//! Locations 2-5 only count when the file exists, so adding a file lower in the
//! list never changes which table is used.
//!
//! ## Base Computation
//!
//! ```text
//! base    = address_of(reference_symbol) - reference_offset
//! entry   = base + offset(entry)          (or absent)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{EntryPoint, OffsetTable};
use crate::config::PluginConfig;
use crate::error::{Result, ZdbError};

/// Longest version token accepted from the host version string.
const MAX_VERSION_LEN: usize = 31;

/// Where the host library usually lives when nothing else finds it.
#[cfg(target_os = "macos")]
pub const FALLBACK_LIBRARY_PATHS: &[&str] = &[
    "/opt/homebrew/opt/llvm/lib/liblldb.dylib",
    "/usr/local/opt/llvm/lib/liblldb.dylib",
    "/Applications/Xcode.app/Contents/SharedFrameworks/LLDB.framework/LLDB",
    "/Library/Developer/CommandLineTools/Library/PrivateFrameworks/LLDB.framework/LLDB",
];

/// Where the host library usually lives when nothing else finds it.
#[cfg(not(target_os = "macos"))]
pub const FALLBACK_LIBRARY_PATHS: &[&str] = &[
    "/usr/lib/liblldb.so",
    "/usr/lib/x86_64-linux-gnu/liblldb.so",
    "/usr/lib/aarch64-linux-gnu/liblldb.so",
    "/usr/local/lib/liblldb.so",
];

/// Resolves exported symbol names to runtime addresses.
///
/// Implemented by [`crate::image::HostLibrary`] for the real host and by
/// plain maps in tests.
pub trait SymbolResolver
{
    /// Address of `symbol`, or `None` if it is not exported.
    fn symbol_address(&self, symbol: &str) -> Option<usize>;
}

/// The LLDB version token used to choose a table file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVersion(String);

impl HostVersion
{
    /// Extract the version from a string such as `"lldb version 21.1.7"`.
    ///
    /// Takes the run of digits and dots that follows `"version "`, capped at
    /// 31 characters. Anything after the run (a git hash, a vendor suffix) is
    /// ignored.
    pub fn parse(version_string: &str) -> Result<Self>
    {
        const MARKER: &str = "version ";

        let unknown = || ZdbError::HostVersionUnknown(version_string.to_string());
        let start = version_string.find(MARKER).ok_or_else(unknown)? + MARKER.len();

        let token: String = version_string[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .take(MAX_VERSION_LEN)
            .collect();

        if token.is_empty() {
            return Err(unknown());
        }

        Ok(Self(token))
    }

    /// Wrap an already-extracted version (from a CLI flag, for example).
    pub fn new(version: impl Into<String>) -> Self
    {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str
    {
        &self.0
    }

    /// `lldb-<version>.json`
    pub fn table_file_name(&self) -> String
    {
        format!("lldb-{}.json", self.0)
    }
}

impl std::fmt::Display for HostVersion
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.write_str(&self.0)
    }
}

/// Which rule of the discovery order produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource
{
    /// `ZDB_OFFSETS_FILE`
    ExplicitFile,
    /// `ZDB_OFFSETS_DIR`
    OffsetsDir,
    /// `~/.config/zdb/offsets`
    UserConfig,
    /// `/usr/local/share/zdb/offsets`
    SystemShare,
    /// `<plugin dir>/../offsets`
    PluginRelative,
}

impl SearchSource
{
    pub fn label(self) -> &'static str
    {
        match self {
            SearchSource::ExplicitFile => "ZDB_OFFSETS_FILE",
            SearchSource::OffsetsDir => "ZDB_OFFSETS_DIR",
            SearchSource::UserConfig => "user config",
            SearchSource::SystemShare => "system share",
            SearchSource::PluginRelative => "plugin relative",
        }
    }
}

/// One location in the discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCandidate
{
    pub path: PathBuf,
    pub source: SearchSource,
}

impl TableCandidate
{
    /// Whether this candidate is taken when it is reached in the order.
    pub fn is_hit(&self) -> bool
    {
        self.source == SearchSource::ExplicitFile || self.path.is_file()
    }
}

/// Every location the loader would look at, in order.
pub fn candidates(config: &PluginConfig, version: &HostVersion) -> Vec<TableCandidate>
{
    let file_name = version.table_file_name();
    let mut out = Vec::with_capacity(5);

    if let Some(file) = &config.offsets_file {
        out.push(TableCandidate { path: file.clone(), source: SearchSource::ExplicitFile });
    }
    if let Some(dir) = &config.offsets_dir {
        out.push(TableCandidate { path: dir.join(&file_name), source: SearchSource::OffsetsDir });
    }
    if let Some(home) = &config.home {
        out.push(TableCandidate {
            path: home.join(".config/zdb/offsets").join(&file_name),
            source: SearchSource::UserConfig,
        });
    }
    out.push(TableCandidate { path: config.system_dir.join(&file_name), source: SearchSource::SystemShare });
    if let Some(dir) = &config.plugin_dir {
        out.push(TableCandidate {
            path: dir.join("..").join("offsets").join(&file_name),
            source: SearchSource::PluginRelative,
        });
    }

    out
}

/// The first candidate that is a hit, if any.
pub fn find_table(config: &PluginConfig, version: &HostVersion) -> Option<TableCandidate>
{
    candidates(config, version).into_iter().find(TableCandidate::is_hit)
}

/// Read and scan a table, rejecting one without a usable reference offset.
pub fn load_table(path: &Path) -> Result<OffsetTable>
{
    let text = fs::read_to_string(path).map_err(|source| ZdbError::TableRead { path: path.to_path_buf(), source })?;
    let table = OffsetTable::parse(&text);

    if !table.is_usable() {
        return Err(ZdbError::TableUnusable { path: path.to_path_buf() });
    }

    Ok(table)
}

/// Decide which host library to resolve symbols in.
///
/// Order: the `ZDB_LIBLLDB_PATH` override, then `probe` (the image that
/// contains a known public LLDB function), then the platform fallbacks that
/// exist on disk.
pub fn resolve_library_path<P>(config: &PluginConfig, probe: P, fallbacks: &[&str]) -> Result<PathBuf>
where
    P: FnOnce() -> Option<PathBuf>,
{
    if let Some(path) = &config.liblldb_path {
        debug!(path = %path.display(), "using ZDB_LIBLLDB_PATH");
        return Ok(path.clone());
    }

    if let Some(path) = probe() {
        debug!(path = %path.display(), "host library found from loaded image");
        return Ok(path);
    }

    fallbacks
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .ok_or(ZdbError::HostLibraryNotFound)
}

/// Offset table resolved against the running host library.
///
/// Built once per plugin load and never mutated.
#[derive(Debug, Clone)]
pub struct ResolvedSymbols
{
    base: usize,
    source: PathBuf,
    table: OffsetTable,
    addresses: [Option<usize>; 3],
}

impl ResolvedSymbols
{
    /// Compute the base from the reference symbol and every entry address.
    pub fn resolve<R>(table: OffsetTable, source: PathBuf, resolver: &R) -> Result<Self>
    where
        R: SymbolResolver + ?Sized,
    {
        let symbol = table.reference_symbol().to_string();
        let address = resolver
            .symbol_address(&symbol)
            .ok_or_else(|| ZdbError::ReferenceSymbolMissing { symbol: symbol.clone() })?;

        let offset = table.reference_offset;
        let base = usize::try_from(offset)
            .ok()
            .and_then(|offset| address.checked_sub(offset))
            .ok_or(ZdbError::ReferenceOffsetOutOfRange { offset, address })?;

        let mut addresses = [None; 3];
        for (slot, entry) in addresses.iter_mut().zip(EntryPoint::ALL) {
            *slot = table
                .offset(entry)
                .and_then(|offset| usize::try_from(offset).ok())
                .and_then(|offset| base.checked_add(offset));
        }

        debug!(base = format_args!("{base:#x}"), symbol = %symbol, "resolved host base");

        Ok(Self { base, source, table, addresses })
    }

    /// Load base of the host library.
    pub fn base(&self) -> usize
    {
        self.base
    }

    /// Runtime address of an entry point, or `None` when the table omits it.
    pub fn address(&self, entry: EntryPoint) -> Option<usize>
    {
        self.addresses[entry.index()]
    }

    /// Like [`ResolvedSymbols::address`] but reports a missing entry as an error.
    pub fn require(&self, entry: EntryPoint) -> Result<usize>
    {
        self.address(entry).ok_or(ZdbError::EntryPointMissing(entry))
    }

    /// The table this set was resolved from.
    pub fn table(&self) -> &OffsetTable
    {
        &self.table
    }

    /// File the table was read from.
    pub fn source(&self) -> &Path
    {
        &self.source
    }
}

/// Find, read and resolve the table for `version`.
///
/// `library` only appears in diagnostics: it names the file the user should
/// run the dumping tool against.
pub fn load<R>(config: &PluginConfig, version: &HostVersion, library: &Path, resolver: &R) -> Result<ResolvedSymbols>
where
    R: SymbolResolver + ?Sized,
{
    let candidate = find_table(config, version).ok_or_else(|| ZdbError::TableNotFound {
        version: version.to_string(),
        file_name: version.table_file_name(),
        library: library.display().to_string(),
    })?;

    debug!(path = %candidate.path.display(), source = candidate.source.label(), "loading offset table");
    let table = load_table(&candidate.path)?;

    if !table.version.is_empty() && table.version != version.as_str() {
        warn!(
            table = %table.version,
            host = %version,
            path = %candidate.path.display(),
            "offset table was generated for a different LLDB version"
        );
    }

    ResolvedSymbols::resolve(table, candidate.path, resolver)
}

//! # Symbol Table Checks
//!
//! Reads the static and dynamic symbol tables of a `liblldb` build and checks
//! an offset table against them.
//!
//! Table offsets are symbol addresses as the linker recorded them (what `nm`
//! prints), so they are compared with [`object::ObjectSymbol::address`]
//! directly. Mach-O symbol names carry an extra leading underscore, which is
//! stripped so names match the Itanium spelling used in tables.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use object::{BinaryFormat, FileKind, Object, ObjectSymbol};
use tracing::debug;
use zdb_core::{EntryPoint, OffsetTable};

/// Errors raised while reading a library's symbols
#[derive(Debug, thiserror::Error)]
pub enum InspectError
{
    #[error("failed to read {}: {source}", path.display())]
    Read
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse
    {
        path: PathBuf,
        reason: String,
    },

    #[error("{} is a universal binary; extract one architecture with `lipo -thin` first", path.display())]
    Universal
    {
        path: PathBuf,
    },

    #[error("{} has no symbols", path.display())]
    NoSymbols
    {
        path: PathBuf,
    },
}

/// Defined symbols of one library, by name and by address.
#[derive(Debug, Default)]
pub struct SymbolTable
{
    by_name: HashMap<String, u64>,
    by_address: BTreeMap<u64, Vec<String>>,
}

impl SymbolTable
{
    /// Read the symbols of the library at `path`.
    pub fn read(path: &Path) -> Result<Self, InspectError>
    {
        let data = fs::read(path).map_err(|source| InspectError::Read { path: path.to_path_buf(), source })?;
        let parse_error = |reason: String| InspectError::Parse { path: path.to_path_buf(), reason };

        match FileKind::parse(&*data).map_err(|err| parse_error(err.to_string()))? {
            FileKind::MachOFat32 | FileKind::MachOFat64 => {
                return Err(InspectError::Universal { path: path.to_path_buf() });
            }
            _ => {}
        }

        let file = object::File::parse(&*data).map_err(|err| parse_error(err.to_string()))?;
        let strip_underscore = file.format() == BinaryFormat::MachO;

        let symbols = file
            .symbols()
            .chain(file.dynamic_symbols())
            .filter(|symbol| symbol.is_definition())
            .filter_map(|symbol| {
                let name = symbol.name().ok()?;
                let name = if strip_underscore { name.strip_prefix('_').unwrap_or(name) } else { name };
                Some((name.to_string(), symbol.address()))
            });

        let table = Self::from_symbols(symbols);
        if table.is_empty() {
            return Err(InspectError::NoSymbols { path: path.to_path_buf() });
        }

        debug!(path = %path.display(), symbols = table.len(), "read symbol table");
        Ok(table)
    }

    /// Build a table from `(name, address)` pairs. The first address seen for
    /// a name is kept.
    pub fn from_symbols<I>(symbols: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut table = Self::default();
        for (name, address) in symbols {
            if table.by_name.contains_key(&name) {
                continue;
            }
            table.by_address.entry(address).or_default().push(name.clone());
            table.by_name.insert(name, address);
        }
        table
    }

    pub fn address_of(&self, name: &str) -> Option<u64>
    {
        self.by_name.get(name).copied()
    }

    /// Every symbol defined at exactly `address`.
    pub fn names_at(&self, address: u64) -> &[String]
    {
        self.by_address.get(&address).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize
    {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.by_name.is_empty()
    }
}

/// Where the table's reference symbol actually sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCheck
{
    pub symbol: String,
    pub expected: u64,
    pub found: Option<u64>,
}

impl ReferenceCheck
{
    pub fn passed(&self) -> bool
    {
        self.found == Some(self.expected)
    }
}

/// Outcome for one entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus
{
    /// The table has no offset for it
    Absent,
    /// The offset is the start of this symbol
    Matches(String),
    /// The offset is the start of symbols for some other function
    Unrelated(Vec<String>),
    /// No symbol starts at the offset
    NoSymbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCheck
{
    pub entry: EntryPoint,
    pub offset: Option<u64>,
    pub status: EntryStatus,
}

impl EntryCheck
{
    /// A missing optional entry point is fine; a missing required one is not.
    pub fn passed(&self) -> bool
    {
        match self.status {
            EntryStatus::Matches(_) => true,
            EntryStatus::Absent => !self.entry.is_required(),
            EntryStatus::Unrelated(_) | EntryStatus::NoSymbol => false,
        }
    }
}

/// Every check made against one library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification
{
    pub reference: ReferenceCheck,
    pub entries: Vec<EntryCheck>,
}

impl Verification
{
    pub fn passed(&self) -> bool
    {
        self.reference.passed() && self.entries.iter().all(EntryCheck::passed)
    }
}

/// Check `table` against the symbols of the library it claims to describe.
pub fn verify(table: &OffsetTable, symbols: &SymbolTable) -> Verification
{
    let reference = ReferenceCheck {
        symbol: table.reference_symbol().to_string(),
        expected: table.reference_offset,
        found: symbols.address_of(table.reference_symbol()),
    };

    let entries = EntryPoint::ALL
        .into_iter()
        .map(|entry| {
            let offset = table.offset(entry);
            let status = offset.map_or(EntryStatus::Absent, |offset| entry_status(entry, symbols.names_at(offset)));
            EntryCheck { entry, offset, status }
        })
        .collect();

    Verification { reference, entries }
}

fn entry_status(entry: EntryPoint, names: &[String]) -> EntryStatus
{
    if names.is_empty() {
        return EntryStatus::NoSymbol;
    }

    names
        .iter()
        .find(|name| name.contains(entry.mangled_method()))
        .map_or_else(|| EntryStatus::Unrelated(names.to_vec()), |name| EntryStatus::Matches(name.clone()))
}

#[cfg(test)]
mod tests
{
    use super::*;

    const GET_CATEGORY: &str = "_ZN12lldb_private17DataVisualization10Categories11GetCategoryENS_11ConstStringERNSt3__110shared_ptrINS_16TypeCategoryImplEEEb";
    const ENABLE: &str = "_ZN12lldb_private17DataVisualization10Categories6EnableERKNSt3__110shared_ptrINS_16TypeCategoryImplEEEj";
    const ADD_SUMMARY: &str = "_ZN12lldb_private16TypeCategoryImpl14AddTypeSummaryEN4llvm9StringRefEN4lldb18FormatterMatchTypeENSt3__110shared_ptrINS_15TypeSummaryImplEEE";

    fn symbols() -> SymbolTable
    {
        SymbolTable::from_symbols([
            ("_ZN4lldb10SBDebugger10InitializeEv".to_string(), 0x1000),
            (GET_CATEGORY.to_string(), 0x2000),
            (ENABLE.to_string(), 0x3000),
            (ADD_SUMMARY.to_string(), 0x4000),
            ("_ZN12lldb_private5Stream6PrintfEPKcz".to_string(), 0x5000),
        ])
    }

    fn table(offsets: [Option<u64>; 3]) -> OffsetTable
    {
        let mut table = OffsetTable::default();
        table.reference_offset = 0x1000;
        for (entry, offset) in EntryPoint::ALL.into_iter().zip(offsets) {
            table.set_offset(entry, offset);
        }
        table
    }

    #[test]
    fn test_matching_table_passes()
    {
        let verification = verify(&table([Some(0x2000), Some(0x3000), Some(0x4000)]), &symbols());

        assert!(verification.passed());
        assert_eq!(verification.reference.found, Some(0x1000));
        assert_eq!(verification.entries[2].status, EntryStatus::Matches(ADD_SUMMARY.to_string()));
    }

    #[test]
    fn test_wrong_reference_offset_fails()
    {
        let mut table = table([Some(0x2000), Some(0x3000), Some(0x4000)]);
        table.reference_offset = 0x1010;

        let verification = verify(&table, &symbols());
        assert!(!verification.reference.passed());
        assert!(!verification.passed());
    }

    #[test]
    fn test_offset_on_another_function_is_unrelated()
    {
        let verification = verify(&table([Some(0x5000), Some(0x3000), Some(0x4000)]), &symbols());

        assert_eq!(
            verification.entries[0].status,
            EntryStatus::Unrelated(vec!["_ZN12lldb_private5Stream6PrintfEPKcz".to_string()])
        );
        assert!(!verification.passed());
    }

    #[test]
    fn test_offset_between_symbols_has_no_symbol()
    {
        let verification = verify(&table([Some(0x2004), Some(0x3000), Some(0x4000)]), &symbols());
        assert_eq!(verification.entries[0].status, EntryStatus::NoSymbol);
    }

    #[test]
    fn test_only_optional_entries_may_be_absent()
    {
        assert!(verify(&table([Some(0x2000), None, Some(0x4000)]), &symbols()).passed());
        assert!(!verify(&table([Some(0x2000), Some(0x3000), None]), &symbols()).passed());
    }

    #[test]
    fn test_first_address_for_a_name_wins()
    {
        let symbols = SymbolTable::from_symbols([("a".to_string(), 1), ("a".to_string(), 2), ("b".to_string(), 1)]);

        assert_eq!(symbols.address_of("a"), Some(1));
        assert_eq!(symbols.names_at(1), ["a", "b"]);
        assert!(symbols.names_at(2).is_empty());
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn test_unparseable_file_is_reported()
    {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not an object file").unwrap();

        assert!(matches!(SymbolTable::read(file.path()), Err(InspectError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_reported()
    {
        assert!(matches!(SymbolTable::read(Path::new("/nonexistent/liblldb.so")), Err(InspectError::Read { .. })));
    }
}

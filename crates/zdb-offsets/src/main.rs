//! `zdb-offsets`: check offset tables without loading the plugin.
//!
//! ```text
//! zdb-offsets locate --lldb-version 21.1.7
//! zdb-offsets show ~/.config/zdb/offsets/lldb-21.1.7.json
//! zdb-offsets verify lldb-21.1.7.json --library /usr/lib/liblldb.so
//! ZDB_USE_INTERNAL_API=1 zdb-offsets resolve --library /usr/lib/liblldb.so
//! ```

mod inspect;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use inspect::{EntryStatus, SymbolTable, Verification};
use zdb_core::config::ENV_USE_INTERNAL_API;
use zdb_core::image::HostLibrary;
use zdb_core::offsets::{loader, HostVersion, ResolvedSymbols};
use zdb_core::sb::{self, SbApi};
use zdb_core::{EntryPoint, OffsetTable, PluginConfig, ZdbError};
use zdb_utils::{LogFormat, LogLevel, LoggingError, info, init_logging, init_logging_with_level};

type CliResult = Result<(), Box<dyn Error>>;

/// Locate, inspect and verify zdb offset tables.
#[derive(Parser, Debug)]
#[command(name = "zdb-offsets")]
#[command(version)]
#[command(about = "Locate, inspect and verify zdb offset tables", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace); RUST_LOG still wins when set
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (pretty or json); overrides ZDB_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli
{
    /// Set up logging from the flags, or from the environment when neither is given.
    fn init_logging(&self) -> Result<(), LoggingError>
    {
        match (self.log_level, self.log_format) {
            (None, None) => init_logging(),
            (level, format) => {
                init_logging_with_level(level.unwrap_or(LogLevel::Info), format.unwrap_or(LogFormat::Pretty))
            }
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List every location searched for a table, in order
    Locate
    {
        /// LLDB version to search for (e.g. 21.1.7)
        #[arg(long)]
        lldb_version: String,
    },
    /// Print a table the way the plugin reads it
    Show
    {
        /// Path to the table file
        file: PathBuf,
    },
    /// Check a table against the symbols of a liblldb build
    Verify
    {
        /// Path to the table file
        file: PathBuf,
        /// The liblldb the table was dumped from
        #[arg(long)]
        library: PathBuf,
    },
    /// Resolve entry-point addresses in this process without calling them
    Resolve
    {
        /// The liblldb to open
        #[arg(long)]
        library: PathBuf,
        /// Version to search a table for (default: ask the library)
        #[arg(long)]
        lldb_version: Option<String>,
    },
}

fn main()
{
    let cli = Cli::parse();

    if let Err(e) = cli.init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_command(cli, &PluginConfig::from_env()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(cli: Cli, config: &PluginConfig) -> CliResult
{
    match cli.command {
        Commands::Locate { lldb_version } => {
            print_lines(locate_lines(config, &HostVersion::new(lldb_version)));
            Ok(())
        }
        Commands::Show { file } => {
            print_lines(show_lines(&read_table(&file)?));
            Ok(())
        }
        Commands::Verify { file, library } => {
            let table = read_table(&file)?;
            let symbols = SymbolTable::read(&library)?;
            let verification = inspect::verify(&table, &symbols);
            print_lines(verify_lines(&verification));

            if verification.passed() {
                Ok(())
            } else {
                Err(format!("{} does not match {}", file.display(), library.display()).into())
            }
        }
        Commands::Resolve { library, lldb_version } => {
            let symbols = resolve(config, &library, lldb_version)?;
            print_lines(resolve_lines(&symbols));
            Ok(())
        }
    }
}

fn print_lines(lines: Vec<String>)
{
    for line in lines {
        println!("{line}");
    }
}

/// Scan a table file without rejecting unusable tables.
fn read_table(path: &Path) -> Result<OffsetTable, ZdbError>
{
    let text = fs::read_to_string(path).map_err(|source| ZdbError::TableRead { path: path.to_path_buf(), source })?;
    Ok(OffsetTable::parse(&text))
}

fn locate_lines(config: &PluginConfig, version: &HostVersion) -> Vec<String>
{
    let mut winner_seen = false;

    loader::candidates(config, version)
        .into_iter()
        .map(|candidate| {
            let hit = candidate.is_hit();
            let marker = if hit && !winner_seen { "=>" } else { "  " };
            winner_seen |= hit;

            let state = if candidate.path.is_file() { "found" } else { "missing" };
            format!("{marker} {:<16} {} ({state})", candidate.source.label(), candidate.path.display())
        })
        .collect()
}

fn show_lines(table: &OffsetTable) -> Vec<String>
{
    let mut lines = vec![
        format!("version:          {}", or_unset(&table.version)),
        format!("reference symbol: {}", table.reference_symbol()),
        format!("reference offset: {:#x}", table.reference_offset),
    ];

    lines.extend(EntryPoint::ALL.into_iter().map(|entry| {
        let offset = table.offset(entry).map_or_else(|| String::from("absent"), |offset| format!("{offset:#x}"));
        format!("  {entry}: {offset}")
    }));

    if !table.is_usable() {
        lines.push(String::from("unusable: reference_offset is missing or zero"));
    }

    lines
}

fn verify_lines(verification: &Verification) -> Vec<String>
{
    let reference = &verification.reference;
    let found = reference.found.map_or_else(|| String::from("not exported"), |address| format!("{address:#x}"));
    let mut lines = vec![format!(
        "{} reference {} expected {:#x}, found {found}",
        mark(reference.passed()),
        reference.symbol,
        reference.expected
    )];

    for check in &verification.entries {
        let detail = match (&check.status, check.offset) {
            (EntryStatus::Absent, _) => String::from("absent"),
            (EntryStatus::Matches(name), Some(offset)) => format!("{offset:#x} {name}"),
            (EntryStatus::Unrelated(names), Some(offset)) => format!("{offset:#x} belongs to {}", names.join(", ")),
            (EntryStatus::NoSymbol, Some(offset)) => format!("{offset:#x} is not the start of a symbol"),
            (_, None) => String::from("absent"),
        };
        lines.push(format!("{} {}: {detail}", mark(check.passed()), check.entry));
    }

    lines
}

fn resolve_lines(symbols: &ResolvedSymbols) -> Vec<String>
{
    let mut lines = vec![
        format!("table: {}", symbols.source().display()),
        format!("base:  {:#x}", symbols.base()),
    ];

    lines.extend(EntryPoint::ALL.into_iter().map(|entry| {
        let address = symbols.address(entry).map_or_else(|| String::from("absent"), |address| format!("{address:#x}"));
        format!("  {entry}: {address}")
    }));

    lines
}

/// Open the library in this process and resolve the table for it.
///
/// Only addresses are computed; no private entry point is ever called.
fn resolve(config: &PluginConfig, library: &Path, lldb_version: Option<String>) -> Result<ResolvedSymbols, Box<dyn Error>>
{
    if !config.use_internal_api {
        return Err(format!("resolving private entry points is disabled; set {ENV_USE_INTERNAL_API}=1 to allow it").into());
    }

    let host = HostLibrary::open(library)?;
    let version = match lldb_version {
        Some(version) => HostVersion::new(version),
        None => {
            let api = SbApi::resolve(&host)?;
            let text = sb::host_version_string(&api).ok_or_else(|| ZdbError::HostVersionUnknown(String::new()))?;
            HostVersion::parse(&text)?
        }
    };

    info!(version = %version, library = %library.display(), "resolving offset table");
    Ok(loader::load(config, &version, library, &host)?)
}

fn mark(passed: bool) -> &'static str
{
    if passed { "ok  " } else { "FAIL" }
}

fn or_unset(text: &str) -> &str
{
    if text.is_empty() { "(unset)" } else { text }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use inspect::{EntryCheck, ReferenceCheck};

    use super::*;

    fn config(vars: &[(&str, &str)], system: &Path) -> PluginConfig
    {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        PluginConfig::from_lookup(|key| vars.get(key).cloned()).with_system_dir(system.to_path_buf())
    }

    #[test]
    fn test_cli_parses_subcommands()
    {
        let cli = Cli::try_parse_from(["zdb-offsets", "verify", "t.json", "--library", "/lib/liblldb.so"]).unwrap();
        assert!(matches!(cli.command, Commands::Verify { ref library, .. } if library == Path::new("/lib/liblldb.so")));

        let cli = Cli::try_parse_from(["zdb-offsets", "resolve", "--library", "liblldb.so"]).unwrap();
        assert!(matches!(cli.command, Commands::Resolve { lldb_version: None, .. }));

        assert!(Cli::try_parse_from(["zdb-offsets", "locate"]).is_err());
    }

    #[test]
    fn test_cli_parses_logging_flags()
    {
        let cli = Cli::try_parse_from(["zdb-offsets", "show", "t.json", "--log-level", "debug", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.log_format, Some(LogFormat::Json));

        let cli = Cli::try_parse_from(["zdb-offsets", "--log-level", "trace", "locate", "--lldb-version", "21.1.7"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Trace));
        assert_eq!(cli.log_format, None);

        assert!(Cli::try_parse_from(["zdb-offsets", "show", "t.json", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn test_locate_marks_the_winner()
    {
        let dir = tempfile::tempdir().unwrap();
        let offsets = dir.path().join("offsets");
        let system = dir.path().join("share");
        fs::create_dir_all(&offsets).unwrap();
        fs::create_dir_all(&system).unwrap();
        fs::write(offsets.join("lldb-21.1.7.json"), "{}").unwrap();
        fs::write(system.join("lldb-21.1.7.json"), "{}").unwrap();

        let config = config(&[("ZDB_OFFSETS_DIR", offsets.to_str().unwrap())], &system);
        let lines = locate_lines(&config, &HostVersion::new("21.1.7"));

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("=> ZDB_OFFSETS_DIR"), "{}", lines[0]);
        assert!(lines[0].ends_with("(found)"));
        assert!(lines[1].starts_with("   system share"), "{}", lines[1]);
        assert!(lines[1].ends_with("(found)"));
    }

    #[test]
    fn test_show_prints_every_entry()
    {
        let table = OffsetTable::parse(
            r#"{"version": "21.1.7", "reference_offset": "0x1000",
                "symbols": {"DataVisualization::Categories::GetCategory": {"offset": "0x2000"},
                            "DataVisualization::Categories::Enable": null}}"#,
        );
        let lines = show_lines(&table);

        assert_eq!(lines[0], "version:          21.1.7");
        assert_eq!(lines[1], "reference symbol: _ZN4lldb10SBDebugger10InitializeEv");
        assert_eq!(lines[2], "reference offset: 0x1000");
        assert_eq!(lines[3], "  DataVisualization::Categories::GetCategory: 0x2000");
        assert_eq!(lines[4], "  DataVisualization::Categories::Enable: absent");
        assert_eq!(lines[5], "  TypeCategoryImpl::AddTypeSummary: absent");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_show_flags_unusable_table()
    {
        let lines = show_lines(&OffsetTable::parse("{}"));
        assert_eq!(lines[0], "version:          (unset)");
        assert_eq!(lines.last().map(String::as_str), Some("unusable: reference_offset is missing or zero"));
    }

    #[test]
    fn test_verify_lines_mark_failures()
    {
        let verification = Verification {
            reference: ReferenceCheck { symbol: String::from("ref"), expected: 0x10, found: Some(0x10) },
            entries: vec![
                EntryCheck {
                    entry: EntryPoint::GetCategory,
                    offset: Some(0x20),
                    status: EntryStatus::Unrelated(vec![String::from("other")]),
                },
                EntryCheck { entry: EntryPoint::EnableCategory, offset: None, status: EntryStatus::Absent },
            ],
        };
        let lines = verify_lines(&verification);

        assert_eq!(lines[0], "ok   reference ref expected 0x10, found 0x10");
        assert_eq!(lines[1], "FAIL DataVisualization::Categories::GetCategory: 0x20 belongs to other");
        assert_eq!(lines[2], "ok   DataVisualization::Categories::Enable: absent");
    }

    #[test]
    fn test_resolve_requires_opt_in()
    {
        let config = config(&[], Path::new("/nonexistent"));
        let error = resolve(&config, Path::new("/nonexistent/liblldb.so"), None).unwrap_err();

        assert!(error.to_string().contains(ENV_USE_INTERNAL_API), "{error}");
    }

    #[test]
    fn test_resolve_reports_unopenable_library()
    {
        let config = config(&[(ENV_USE_INTERNAL_API, "1")], Path::new("/nonexistent"));
        let error = resolve(&config, Path::new("/nonexistent/liblldb.so"), Some(String::from("21.1.7"))).unwrap_err();

        assert!(error.to_string().contains("/nonexistent/liblldb.so"), "{error}");
    }
}

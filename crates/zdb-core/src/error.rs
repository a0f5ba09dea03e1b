//! # Error Types
//!
//! Error handling for offset loading and formatter registration.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages. Every variant is something the plugin reports to
//! the user through the log and then recovers from: a registration failure
//! never unloads the plugin.

use std::path::PathBuf;

use thiserror::Error;

use crate::offsets::EntryPoint;

/// Main error type for zdb operations
///
/// ## Error Categories
///
/// 1. **Discovery errors**: HostVersionUnknown, TableNotFound, HostLibraryNotFound
/// 2. **Table errors**: TableUnusable, TableRead, ReferenceOffsetOutOfRange
/// 3. **Symbol errors**: ReferenceSymbolMissing, EntryPointMissing, HostApiMissing
/// 4. **Registration errors**: CategoryUnavailable, SummaryCreationFailed, CommandRegistration,
///    HostCommandFailed
/// 5. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum ZdbError
{
    /// The host version string did not contain `"version "`.
    #[error("could not parse LLDB version from {0:?}")]
    HostVersionUnknown(String),

    /// Every location in the search order came up empty
    ///
    /// The message carries the command that produces the missing table, since
    /// that is the only way forward for the user.
    #[error(
        "no offset file found for LLDB {version}; generate one with: python3 tools/dump_offsets.py {library} > {file_name}, then set ZDB_OFFSETS_FILE or ZDB_OFFSETS_DIR"
    )]
    TableNotFound
    {
        /// Host version the table was searched for
        version: String,
        /// File name that was expected (`lldb-<version>.json`)
        file_name: String,
        /// Host library the table should be generated from
        library: String,
    },

    /// The table was found but has no usable reference offset.
    #[error("offset file {} has no usable reference_offset", path.display())]
    TableUnusable
    {
        /// Path of the rejected table
        path: PathBuf,
    },

    /// The table could not be read from disk.
    #[error("failed to read offset file {}: {source}", path.display())]
    TableRead
    {
        /// Path of the table
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// No override, probe or fallback produced a host library path.
    #[error("could not locate liblldb; set ZDB_LIBLLDB_PATH")]
    HostLibraryNotFound,

    /// `dlopen` refused the host library.
    #[error("failed to open {}: {reason}", path.display())]
    HostLibraryOpen
    {
        /// Path handed to the dynamic loader
        path: PathBuf,
        /// Loader diagnostic
        reason: String,
    },

    /// The reference symbol is not exported by the host library.
    #[error("reference symbol not found: {symbol}")]
    ReferenceSymbolMissing
    {
        /// Mangled name that was looked up
        symbol: String,
    },

    /// The reference offset is larger than the symbol's address.
    ///
    /// This only happens when the table was produced from a different build.
    #[error("reference offset 0x{offset:x} exceeds symbol address 0x{address:x}")]
    ReferenceOffsetOutOfRange
    {
        /// Offset recorded in the table
        offset: u64,
        /// Address the symbol resolved to
        address: usize,
    },

    /// A private entry point needed by the current step has no offset.
    #[error("missing required offset for {0}")]
    EntryPointMissing(EntryPoint),

    /// Category lookup returned an empty handle.
    #[error("failed to create '{0}' category")]
    CategoryUnavailable(String),

    /// The public summary factory returned an invalid wrapper.
    #[error("could not create summary for pattern {pattern}")]
    SummaryCreationFailed
    {
        /// Type-name pattern that was being registered
        pattern: &'static str,
    },

    /// A public scripting-bridge symbol could not be resolved.
    #[error("liblldb does not export {symbol}")]
    HostApiMissing
    {
        /// Mangled name of the public symbol
        symbol: String,
    },

    /// The interpreter refused one of the plugin's commands.
    #[error("could not register command '{command}'")]
    CommandRegistration
    {
        command: String,
    },

    /// The interpreter ran a command line for the plugin and reported failure.
    #[error("'{line}' failed: {message}")]
    HostCommandFailed
    {
        line: String,
        message: String,
    },

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, ZdbError>`
///
/// ```rust
/// use zdb_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, ZdbError>;

//! # zdb
//!
//! The LLDB plugin. Load it with:
//!
//! ```text
//! (lldb) plugin load /path/to/libzdb.so
//! ```
//!
//! LLDB looks up `lldb::PluginInitialize(lldb::SBDebugger)` in the library and
//! calls it once. [`plugin_initialize`] then:
//!
//! 1. Sets up logging on stderr
//! 2. Finds and opens the host `liblldb`
//! 3. Resolves the public scripting-bridge API from it
//! 4. Installs the print command (`p`, `zig print`, `zig p`)
//! 5. Loads the offset table for the host version and registers the Zig
//!    summaries into the `zig` category
//!
//! A failure in step 5 leaves the print command working. The entry point
//! always reports success so LLDB keeps the plugin loaded.

#![allow(unsafe_code)] // The entry point is an exported C ABI function

use std::ffi::c_void;
use std::panic;

use tracing::{error, info, warn};
use zdb_core::abi::PrivateEntryPoints;
use zdb_core::abi::surgery::SummaryRegistry;
use zdb_core::image::{self, HostLibrary};
use zdb_core::offsets::loader::{self, FALLBACK_LIBRARY_PATHS};
use zdb_core::registration::{self, Registration};
use zdb_core::sb::{self, SbApi, SbSummaryFactory};
use zdb_core::{PluginConfig, Result, ZdbError};

/// `bool lldb::PluginInitialize(lldb::SBDebugger debugger)`
///
/// The `SBDebugger` is passed by value, which the Itanium ABI turns into a
/// pointer to a caller-owned copy.
#[export_name = "_ZN4lldb16PluginInitializeENS_10SBDebuggerE"]
pub extern "C" fn plugin_initialize(debugger: *mut c_void) -> bool
{
    if panic::catch_unwind(|| initialize(debugger)).is_err() {
        error!("zdb initialization panicked");
    }
    true
}

fn initialize(debugger: *mut c_void)
{
    zdb_utils::init_plugin_logging();

    let config = PluginConfig::from_env().with_plugin_dir(image::plugin_image_dir());

    let host = match open_host(&config) {
        Ok(host) => host,
        Err(error) => {
            error!(%error, "zdb disabled");
            return;
        }
    };

    let api = match SbApi::resolve(host) {
        Ok(api) => sb::install(api),
        Err(error) => {
            error!(%error, path = %host.path().display(), "zdb disabled");
            return;
        }
    };

    // SAFETY: LLDB passes the debugger that is loading the plugin.
    if let Err(error) = unsafe { sb::install_commands(api, debugger) } {
        warn!(%error, "print command not installed");
    }

    match register_formatters(&config, host, api) {
        Ok(outcome) => info!(
            installed = outcome.installed,
            skipped = outcome.skipped.len(),
            "zdb loaded"
        ),
        Err(error) => error!(%error, "Zig formatters not registered"),
    }
}

/// Locate the host library and keep it open for the rest of the process.
fn open_host(config: &PluginConfig) -> Result<&'static HostLibrary>
{
    let path = loader::resolve_library_path(config, image::probe_host_library, FALLBACK_LIBRARY_PATHS)?;
    Ok(HostLibrary::open(&path)?.into_process_lifetime())
}

fn register_formatters(config: &PluginConfig, host: &'static HostLibrary, api: &'static SbApi) -> Result<Registration>
{
    let version = sb::host_version_string(api).ok_or_else(|| ZdbError::HostVersionUnknown(String::new()))?;
    let symbols = registration::resolve_host(config, &version, host.path(), host)?;

    // SAFETY: every address was derived from a table whose reference symbol
    // matched this host library.
    let entry_points = unsafe { PrivateEntryPoints::from_resolved(&symbols) };

    let factory = SbSummaryFactory::new(api);
    let mut registry = SummaryRegistry::new();
    let outcome = registration::install_formatters(&entry_points, &factory, &mut registry);

    // Installed summaries point into these wrappers, even after a later failure.
    registry.into_process_lifetime();
    outcome
}

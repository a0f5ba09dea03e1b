//! # Plugin Configuration
//!
//! Every environment input the plugin reacts to, read once at load time.
//!
//! ## Environment Variables
//!
//! - `ZDB_OFFSETS_FILE`: Path to a specific offset table (highest priority)
//! - `ZDB_OFFSETS_DIR`: Directory containing `lldb-<version>.json` tables
//! - `ZDB_LIBLLDB_PATH`: Host library to resolve symbols in
//! - `ZDB_USE_INTERNAL_API`: `1` enables the resolve-only dry-run in `zdb-offsets`
//! - `HOME`: Base of the per-user table directory `~/.config/zdb/offsets`
//!
//! The loader never reads the process environment itself; it receives a
//! [`PluginConfig`]. Tests build one with [`PluginConfig::from_lookup`] so
//! they don't depend on (or mutate) the real environment.

use std::env;
use std::path::PathBuf;

/// Explicit offset table path.
pub const ENV_OFFSETS_FILE: &str = "ZDB_OFFSETS_FILE";
/// Directory of per-version tables.
pub const ENV_OFFSETS_DIR: &str = "ZDB_OFFSETS_DIR";
/// Host library override.
pub const ENV_LIBLLDB_PATH: &str = "ZDB_LIBLLDB_PATH";
/// Dry-run switch for the verification tool.
pub const ENV_USE_INTERNAL_API: &str = "ZDB_USE_INTERNAL_API";

/// System-wide table directory.
pub const SYSTEM_OFFSETS_DIR: &str = "/usr/local/share/zdb/offsets";

/// Configuration gathered from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginConfig
{
    /// `ZDB_OFFSETS_FILE`, if set and non-empty
    pub offsets_file: Option<PathBuf>,
    /// `ZDB_OFFSETS_DIR`, if set and non-empty
    pub offsets_dir: Option<PathBuf>,
    /// `HOME`, if set and non-empty
    pub home: Option<PathBuf>,
    /// System-wide table directory
    pub system_dir: PathBuf,
    /// Directory containing the loaded plugin image (development builds)
    pub plugin_dir: Option<PathBuf>,
    /// `ZDB_LIBLLDB_PATH`, if set and non-empty
    pub liblldb_path: Option<PathBuf>,
    /// `ZDB_USE_INTERNAL_API == "1"`
    pub use_internal_api: bool,
}

impl PluginConfig
{
    /// Read the configuration from the process environment.
    ///
    /// The plugin directory is not an environment input; callers that know
    /// where the plugin image lives attach it with [`PluginConfig::with_plugin_dir`].
    #[must_use]
    pub fn from_env() -> Self
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset, matching how the variables behave
    /// when exported with no value from a shell profile.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).filter(|value| !value.is_empty()).map(PathBuf::from);

        Self {
            offsets_file: path(ENV_OFFSETS_FILE),
            offsets_dir: path(ENV_OFFSETS_DIR),
            home: path("HOME"),
            system_dir: PathBuf::from(SYSTEM_OFFSETS_DIR),
            plugin_dir: None,
            liblldb_path: path(ENV_LIBLLDB_PATH),
            use_internal_api: lookup(ENV_USE_INTERNAL_API).as_deref() == Some("1"),
        }
    }

    /// Attach the directory of the loaded plugin image.
    #[must_use]
    pub fn with_plugin_dir(mut self, dir: Option<PathBuf>) -> Self
    {
        self.plugin_dir = dir;
        self
    }

    /// Replace the system-wide table directory.
    #[must_use]
    pub fn with_system_dir(mut self, dir: PathBuf) -> Self
    {
        self.system_dir = dir;
        self
    }
}

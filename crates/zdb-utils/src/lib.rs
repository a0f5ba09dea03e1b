//! # zdb Utilities
//!
//! Logging infrastructure shared by the zdb plugin and the `zdb-offsets` tool.
//!
//! Both run inside someone else's terminal: the plugin shares a process with
//! LLDB, and the tool's stdout is its report. Log output therefore always goes
//! to stderr or a file, never stdout.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{LogFormat, LogLevel, LoggingError, init_logging, init_logging_with_level, init_plugin_logging};
pub use tracing::{debug, error, info, trace, warn};

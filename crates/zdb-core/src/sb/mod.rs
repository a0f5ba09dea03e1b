//! # Scripting Bridge
//!
//! The plugin's view of LLDB's public `lldb::SB*` classes.
//!
//! LLDB loads plugins into a process that already has `liblldb` mapped, but it
//! does not hand them a header-compatible API: every member function is
//! reached through the mangled symbol resolved into [`SbApi`]. This module
//! wraps those calls so the rest of the crate works with [`SbValue`],
//! [`SbFrame`] and friends, which implement the crate's host-independent
//! traits.
//!
//! ## Lifetime
//!
//! [`install`] stores the resolved API for the life of the process. Summary
//! callbacks and the print command receive no user data, so they read it back
//! through `api()`.

use once_cell::sync::OnceCell;

pub mod command;
pub mod ffi;
pub mod frame;
mod object;
pub mod summary;
pub mod value;

pub use command::install_commands;
pub use ffi::SbApi;
pub use frame::{SbContext, SbFrame};
pub use object::SbStorage;
pub use summary::{SbSummaryFactory, SbTypeSummary};
pub use value::SbValue;

static API: OnceCell<SbApi> = OnceCell::new();

/// Make `api` the process-wide scripting-bridge API.
///
/// The first call wins; later calls return the API already installed.
pub fn install(api: SbApi) -> &'static SbApi
{
    API.get_or_init(|| api)
}

/// The installed API, if the plugin got that far.
pub(crate) fn api() -> Option<&'static SbApi>
{
    API.get()
}

/// `SBDebugger::GetVersionString()`, e.g. `lldb version 21.1.7`.
pub fn host_version_string(api: &SbApi) -> Option<String>
{
    // SAFETY: a static member taking no arguments; the returned string is
    // owned by LLDB.
    unsafe { object::host_text((api.debugger_version_string)()) }
}

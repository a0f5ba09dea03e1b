//! # Loaded Images
//!
//! Finding the host library and the plugin itself inside the debugger process.
//!
//! Both questions are answered the same way: take an address we know belongs to
//! an image and ask the dynamic loader (`dladdr`) which file that image was
//! mapped from.

use std::ffi::{CStr, c_void};
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::debug;

use crate::error::{Result, ZdbError};
use crate::offsets::SymbolResolver;

/// Public LLDB function used to find the host library from inside the process.
const PROBE_SYMBOL: &str = "_ZN4lldb10SBDebugger16GetVersionStringEv";

/// Path of the image that contains `address`.
pub fn image_path_containing(address: *const c_void) -> Option<PathBuf>
{
    if address.is_null() {
        return None;
    }

    let mut info = std::mem::MaybeUninit::<libc::Dl_info>::zeroed();
    // SAFETY: dladdr only writes to `info`; a zero return means it found nothing.
    let found = unsafe { libc::dladdr(address, info.as_mut_ptr()) };
    if found == 0 {
        return None;
    }

    // SAFETY: dladdr succeeded, so `info` is initialized.
    let info = unsafe { info.assume_init() };
    if info.dli_fname.is_null() {
        return None;
    }

    // SAFETY: dli_fname points at a NUL-terminated path owned by the loader.
    let name = unsafe { CStr::from_ptr(info.dli_fname) };
    name.to_str().ok().map(PathBuf::from)
}

/// Directory containing the image this crate is linked into.
///
/// In the plugin build that is the plugin's own shared library.
pub fn plugin_image_dir() -> Option<PathBuf>
{
    let marker: fn() -> Option<PathBuf> = plugin_image_dir;
    let path = image_path_containing(marker as *const c_void)?;
    path.parent().map(Path::to_path_buf)
}

/// Find the host library by looking up a public LLDB function already loaded
/// into this process.
pub fn probe_host_library() -> Option<PathBuf>
{
    #[cfg(unix)]
    {
        let this = libloading::os::unix::Library::this();
        // SAFETY: the symbol is only used as an address, never called.
        let address = unsafe { this.get::<*mut c_void>(PROBE_SYMBOL.as_bytes()) }.ok().map(|symbol| *symbol)?;
        image_path_containing(address)
    }

    #[cfg(not(unix))]
    {
        None
    }
}

/// The host library, opened for symbol resolution.
///
/// The mapping is already present in the debugger process; opening it again
/// only bumps the loader's reference count. Call
/// [`HostLibrary::into_process_lifetime`] once resolution succeeds so the
/// handle (and with it every resolved address) is never released.
#[derive(Debug)]
pub struct HostLibrary
{
    path: PathBuf,
    library: Library,
}

impl HostLibrary
{
    /// `dlopen` the library at `path`.
    pub fn open(path: &Path) -> Result<Self>
    {
        // SAFETY: the host library is already initialized inside this process,
        // so reopening it runs no constructors.
        let library = unsafe { Library::new(path) }.map_err(|err| ZdbError::HostLibraryOpen {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        debug!(path = %path.display(), "opened host library");
        Ok(Self { path: path.to_path_buf(), library })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Keep the library open until the process exits.
    pub fn into_process_lifetime(self) -> &'static Self
    {
        Box::leak(Box::new(self))
    }
}

impl SymbolResolver for HostLibrary
{
    fn symbol_address(&self, symbol: &str) -> Option<usize>
    {
        // SAFETY: the symbol is read as an address only.
        let symbol = unsafe { self.library.get::<*mut c_void>(symbol.as_bytes()) }.ok()?;
        let address = *symbol as usize;
        (address != 0).then_some(address)
    }
}

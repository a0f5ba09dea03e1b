//! # Private Entry Point Adapter
//!
//! Typed calls into the three non-exported LLDB functions that install a
//! summary formatter into a category.
//!
//! ## Calling Convention
//!
//! Every signature below is the C-level shape of a C++ function on a 64-bit
//! Itanium-ABI target (x86-64 System V, AArch64 AAPCS64):
//!
//! | C++ parameter                     | Passed as                              |
//! |-----------------------------------|----------------------------------------|
//! | `ConstString` (one pointer)       | the pointer, in a register             |
//! | `llvm::StringRef` (two words)     | two scalars: data pointer, length      |
//! | `FormatterMatchType` (enum)       | `i32`                                  |
//! | `std::shared_ptr<T>` by value     | pointer to caller-owned storage        |
//! | `std::shared_ptr<T>&` / `const &` | pointer                                |
//! | `this`                            | first pointer argument                 |
//!
//! `shared_ptr` has a non-trivial destructor, so the Itanium ABI passes it by
//! hidden reference even when it is a by-value parameter. The types here spell
//! that out instead of relying on Rust's aggregate passing.
//!
//! ## Robustness
//!
//! An entry point the offset table does not record is stored as `None` and is
//! never called: the call returns [`ZdbError::EntryPointMissing`] instead.

pub mod surgery;

use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;

use tracing::trace;

use crate::error::{Result, ZdbError};
use crate::offsets::{EntryPoint, ResolvedSymbols};

/// Two-word layout of a host `std::shared_ptr<T>`.
///
/// The plugin never builds one from scratch. It receives one from the category
/// lookup, or borrows the one embedded in a public summary wrapper.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedHandle
{
    /// Pointer to the managed object
    pub payload: *mut c_void,
    /// Pointer to the control block (reference counts)
    pub control: *mut c_void,
}

impl SharedHandle
{
    /// A handle that owns nothing (`shared_ptr()`).
    pub const fn empty() -> Self
    {
        Self { payload: ptr::null_mut(), control: ptr::null_mut() }
    }

    pub fn is_empty(&self) -> bool
    {
        self.payload.is_null()
    }
}

impl Default for SharedHandle
{
    fn default() -> Self
    {
        Self::empty()
    }
}

/// How a registered type-name pattern is matched (`lldb::FormatterMatchType`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType
{
    Exact = 0,
    Regex = 1,
    Callback = 2,
}

/// `DataVisualization::Categories::GetCategory(ConstString, TypeCategoryImplSP&, bool)`
pub type GetCategoryFn = unsafe extern "C" fn(name: *const c_char, out: *mut SharedHandle, can_create: bool);

/// `DataVisualization::Categories::Enable(const TypeCategoryImplSP&, uint32_t)`
pub type EnableCategoryFn = unsafe extern "C" fn(category: *const SharedHandle, position: u32);

/// `TypeCategoryImpl::AddTypeSummary(StringRef, FormatterMatchType, TypeSummaryImplSP)`
pub type AddTypeSummaryFn = unsafe extern "C" fn(
    this: *mut c_void,
    name_data: *const c_char,
    name_len: usize,
    match_type: i32,
    summary: *mut SharedHandle,
);

/// The category operations registration needs.
///
/// [`PrivateEntryPoints`] implements this against the real host; tests use a
/// recording implementation.
pub trait CategoryApi
{
    /// Look a category up by name, creating it when `create` is set.
    ///
    /// The returned handle may be empty; callers decide whether that is fatal.
    fn get_category(&self, name: &str, create: bool) -> Result<SharedHandle>;

    /// Enable a category at `position` (0 = highest priority).
    fn enable_category(&self, category: &SharedHandle, position: u32) -> Result<()>;

    /// Bind a summary to a type-name pattern inside `category`.
    ///
    /// `summary` must stay alive for as long as the category does.
    fn add_type_summary(
        &self,
        category: &SharedHandle,
        pattern: &str,
        match_type: MatchType,
        summary: &mut SharedHandle,
    ) -> Result<()>;

    /// Whether `entry` can be called at all.
    fn supports(&self, entry: EntryPoint) -> bool;
}

/// Function pointers taken at `base + offset` for each entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivateEntryPoints
{
    get_category: Option<GetCategoryFn>,
    enable_category: Option<EnableCategoryFn>,
    add_type_summary: Option<AddTypeSummaryFn>,
}

impl PrivateEntryPoints
{
    /// Capture typed pointers for every resolved address.
    ///
    /// # Safety
    ///
    /// Each address in `symbols` must be the entry of the function named by its
    /// [`EntryPoint`] in the host library that is mapped in this process. That
    /// holds exactly when the offset table matches the running host build.
    pub unsafe fn from_resolved(symbols: &ResolvedSymbols) -> Self
    {
        // SAFETY: non-zero addresses are function entries per the contract above.
        unsafe {
            Self {
                get_category: symbols
                    .address(EntryPoint::GetCategory)
                    .map(|address| std::mem::transmute::<usize, GetCategoryFn>(address)),
                enable_category: symbols
                    .address(EntryPoint::EnableCategory)
                    .map(|address| std::mem::transmute::<usize, EnableCategoryFn>(address)),
                add_type_summary: symbols
                    .address(EntryPoint::AddTypeSummary)
                    .map(|address| std::mem::transmute::<usize, AddTypeSummaryFn>(address)),
            }
        }
    }
}

impl CategoryApi for PrivateEntryPoints
{
    fn get_category(&self, name: &str, create: bool) -> Result<SharedHandle>
    {
        let call = self.get_category.ok_or(ZdbError::EntryPointMissing(EntryPoint::GetCategory))?;
        let name = CString::new(name).map_err(|_| ZdbError::CategoryUnavailable(name.to_string()))?;
        // The name stands in for an interned string and may be kept as the key
        // of the category map, so it is never freed.
        let name: &'static CStr = Box::leak(name.into_boxed_c_str());

        // The host keeps a reference in its category map; the one written here
        // is ours and is intentionally never released.
        let mut out = SharedHandle::empty();
        trace!(name = ?name, create, "GetCategory");
        // SAFETY: `name` is NUL-terminated and never freed; `out` is a
        // valid two-word slot the callee assigns into.
        unsafe { call(name.as_ptr(), &mut out, create) };

        Ok(out)
    }

    fn enable_category(&self, category: &SharedHandle, position: u32) -> Result<()>
    {
        let call = self.enable_category.ok_or(ZdbError::EntryPointMissing(EntryPoint::EnableCategory))?;

        trace!(position, "Enable");
        // SAFETY: `category` is a live shared_ptr produced by GetCategory.
        unsafe { call(category, position) };
        Ok(())
    }

    fn add_type_summary(
        &self,
        category: &SharedHandle,
        pattern: &str,
        match_type: MatchType,
        summary: &mut SharedHandle,
    ) -> Result<()>
    {
        let call = self.add_type_summary.ok_or(ZdbError::EntryPointMissing(EntryPoint::AddTypeSummary))?;
        if category.is_empty() {
            return Err(ZdbError::CategoryUnavailable(String::from("<empty handle>")));
        }

        trace!(pattern, ?match_type, "AddTypeSummary");
        // SAFETY: `this` is the category object; the StringRef is copied by the
        // callee; `summary` points into a wrapper kept for the process lifetime.
        unsafe {
            call(category.payload, pattern.as_ptr().cast::<c_char>(), pattern.len(), match_type as i32, summary);
        }
        Ok(())
    }

    fn supports(&self, entry: EntryPoint) -> bool
    {
        match entry {
            EntryPoint::GetCategory => self.get_category.is_some(),
            EntryPoint::EnableCategory => self.enable_category.is_some(),
            EntryPoint::AddTypeSummary => self.add_type_summary.is_some(),
        }
    }
}

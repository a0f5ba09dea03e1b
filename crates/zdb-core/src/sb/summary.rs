//! Callback summaries built with `SBTypeSummary::CreateWithCallback`.
//!
//! LLDB calls a summary callback with no user data, so each [`SummaryKind`]
//! gets its own monomorphized trampoline.

use std::ffi::{CString, c_char, c_void};
use std::panic::{self, AssertUnwindSafe};

use super::SbApi;
use super::ffi::{SummaryCallback, TYPE_OPTION_CASCADE};
use super::object::SbObject;
use super::value::SbValue;
use crate::abi::SharedHandle;
use crate::abi::surgery::{HandleWrapper, SummaryFactory};
use crate::summaries::SummaryKind;

/// An `lldb::SBTypeSummary`.
pub struct SbTypeSummary
{
    api: &'static SbApi,
    object: SbObject,
}

// SAFETY: SBTypeSummary's only member is its `TypeSummaryImplSP`, which starts
// at offset 0 of the boxed storage `object` points into.
unsafe impl HandleWrapper for SbTypeSummary
{
    fn is_valid(&self) -> bool
    {
        // SAFETY: `object` holds an SBTypeSummary.
        unsafe { (self.api.summary_is_valid)(self.object.as_ptr()) }
    }

    fn shared_handle(&mut self) -> &mut SharedHandle
    {
        // SAFETY: see the impl-level comment; `&mut self` makes the borrow unique.
        unsafe { &mut *self.object.as_ptr().cast::<SharedHandle>() }
    }
}

/// Builds [`SbTypeSummary`] wrappers around the trampolines below.
#[derive(Clone, Copy)]
pub struct SbSummaryFactory
{
    api: &'static SbApi,
}

impl SbSummaryFactory
{
    pub fn new(api: &'static SbApi) -> Self
    {
        Self { api }
    }
}

impl SummaryFactory for SbSummaryFactory
{
    type Wrapper = SbTypeSummary;

    fn create(&self, kind: SummaryKind, description: &str) -> Option<SbTypeSummary>
    {
        let description = CString::new(description).ok()?;
        // SAFETY: the callback has the FormatCallback signature; the
        // description is copied by the host.
        let storage = unsafe {
            (self.api.summary_create_with_callback)(callback_for(kind), TYPE_OPTION_CASCADE, description.as_ptr())
        };
        Some(SbTypeSummary { api: self.api, object: SbObject::from_returned(storage, self.api.summary_dtor) })
    }
}

/// The trampoline registered for `kind`.
pub fn callback_for(kind: SummaryKind) -> SummaryCallback
{
    match kind {
        SummaryKind::Struct => summarize::<0>,
        SummaryKind::Array => summarize::<1>,
        SummaryKind::Slice => summarize::<2>,
        SummaryKind::String => summarize::<3>,
        SummaryKind::Optional => summarize::<4>,
        SummaryKind::ErrorUnion => summarize::<5>,
        SummaryKind::TaggedUnion => summarize::<6>,
        SummaryKind::Pointer => summarize::<7>,
        SummaryKind::ArrayList => summarize::<8>,
        SummaryKind::HashMap => summarize::<9>,
        SummaryKind::BoundedArray => summarize::<10>,
        SummaryKind::MultiArrayList => summarize::<11>,
        SummaryKind::SegmentedList => summarize::<12>,
        SummaryKind::CString => summarize::<13>,
    }
}

/// `bool callback(SBValue, SBTypeSummaryOptions, SBStream&)` for `SummaryKind::ALL[KIND]`.
unsafe extern "C" fn summarize<const KIND: usize>(value: *mut c_void, _options: *mut c_void, stream: *mut c_void) -> bool
{
    let render = AssertUnwindSafe(|| {
        let Some(api) = super::api() else {
            return false;
        };
        // SAFETY: LLDB passes a live SBValue for the duration of the call.
        let Some(value) = (unsafe { SbValue::borrowed(api, value) }) else {
            return false;
        };
        let Some(text) = SummaryKind::ALL[KIND].render(&value) else {
            return false;
        };
        // SAFETY: LLDB passes a live SBStream for the duration of the call.
        unsafe { write_stream(api, stream, &text) };
        true
    });

    panic::catch_unwind(render).unwrap_or(false)
}

/// `stream.Printf("%s", text)`
///
/// # Safety
///
/// `stream` must point at a live `SBStream`.
pub(crate) unsafe fn write_stream(api: &SbApi, stream: *mut c_void, text: &str)
{
    if stream.is_null() {
        return;
    }

    let text = CString::new(text.replace('\0', "\\x00")).unwrap_or_default();
    // SAFETY: "%s" consumes exactly the one C string argument passed.
    unsafe { (api.stream_printf)(stream, b"%s\0".as_ptr().cast::<c_char>(), text.as_ptr()) };
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_every_kind_has_a_distinct_trampoline()
    {
        let mut unique: Vec<usize> = SummaryKind::ALL.iter().map(|kind| callback_for(*kind) as usize).collect();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), SummaryKind::ALL.len());
    }

    #[test]
    fn test_trampoline_index_matches_kind()
    {
        // Each arm of `callback_for` must use the kind's position in ALL.
        for (index, kind) in SummaryKind::ALL.iter().enumerate() {
            let expected: SummaryCallback = match index {
                0 => summarize::<0>,
                1 => summarize::<1>,
                2 => summarize::<2>,
                3 => summarize::<3>,
                4 => summarize::<4>,
                5 => summarize::<5>,
                6 => summarize::<6>,
                7 => summarize::<7>,
                8 => summarize::<8>,
                9 => summarize::<9>,
                10 => summarize::<10>,
                11 => summarize::<11>,
                12 => summarize::<12>,
                _ => summarize::<13>,
            };
            assert_eq!(callback_for(*kind) as usize, expected as usize, "{kind:?}");
        }
    }

    #[test]
    fn test_trampoline_without_api_declines()
    {
        // The host API is never installed in unit tests.
        let handled = unsafe { summarize::<2>(std::ptr::null_mut(), std::ptr::null_mut(), std::ptr::null_mut()) };
        assert!(!handled);
    }
}

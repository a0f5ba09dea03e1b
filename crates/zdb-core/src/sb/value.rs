//! `SBValue` and the process memory reads behind it.

use std::ffi::{CString, c_void};

use super::SbApi;
use super::ffi::{ReadMemoryFn, TextGetter};
use super::object::{SbObject, SbStorage, host_text};
use crate::value::ValueHandle;

/// An `lldb::SBValue`.
pub struct SbValue
{
    api: &'static SbApi,
    object: SbObject,
}

impl SbValue
{
    /// Wrap a value returned by the host, discarding invalid ones.
    pub(crate) fn from_object(api: &'static SbApi, object: SbObject) -> Option<Self>
    {
        let value = Self { api, object };
        value.is_valid().then_some(value)
    }

    /// Take ownership of a returned value without checking it.
    pub(crate) fn from_returned(api: &'static SbApi, storage: SbStorage) -> Self
    {
        Self { api, object: SbObject::from_returned(storage, api.value_dtor) }
    }

    pub fn is_valid(&self) -> bool
    {
        // SAFETY: `object` holds an SBValue.
        unsafe { (self.api.value_is_valid)(self.as_ptr()) }
    }

    /// Borrow the `SBValue` a summary callback received.
    ///
    /// # Safety
    ///
    /// `ptr` must point at an `SBValue` that outlives the returned wrapper.
    pub(crate) unsafe fn borrowed(api: &'static SbApi, ptr: *mut c_void) -> Option<Self>
    {
        // SAFETY: forwarded from the caller.
        let object = unsafe { SbObject::borrowed(ptr) }?;
        Self::from_object(api, object)
    }

    pub(crate) fn as_ptr(&self) -> *mut c_void
    {
        self.object.as_ptr()
    }

    fn object(&self, returned: SbStorage) -> Option<Self>
    {
        Self::from_object(self.api, SbObject::from_returned(returned, self.api.value_dtor))
    }

    fn text(&self, getter: TextGetter) -> Option<String>
    {
        // SAFETY: `getter` is an SBValue member returning a C string owned by LLDB.
        unsafe { host_text(getter(self.as_ptr())) }
    }

    /// The value's `SBError` message, if evaluation failed.
    pub fn error_message(&self) -> Option<String>
    {
        let api = self.api;
        // SAFETY: GetError returns an SBError by value.
        let error = SbObject::from_returned(unsafe { (api.value_error)(self.as_ptr()) }, api.error_dtor);
        // SAFETY: `error` holds an SBError.
        if unsafe { (api.error_success)(error.as_ptr()) } {
            return None;
        }
        // SAFETY: as above.
        unsafe { host_text((api.error_c_string)(error.as_ptr())) }.or_else(|| Some(String::from("expression failed")))
    }

    /// `GetDescription` text, as `p` would print it.
    pub fn description(&self) -> Option<String>
    {
        let api = self.api;
        let stream = SbObject::construct(api.stream_ctor, api.stream_dtor);
        // SAFETY: `stream` holds a constructed SBStream.
        if !unsafe { (api.value_description)(self.as_ptr(), stream.as_ptr()) } {
            return None;
        }
        // SAFETY: GetData returns the stream's buffer, valid while `stream` lives.
        unsafe { host_text((api.stream_data)(stream.as_ptr())) }.map(|text| text.trim_end().to_string())
    }

    fn read(&self, reader: ReadMemoryFn, address: u64, buffer: &mut [u8]) -> Option<usize>
    {
        let api = self.api;
        // SAFETY: GetProcess returns an SBProcess by value.
        let process = SbObject::from_returned(unsafe { (api.value_process)(self.as_ptr()) }, api.process_dtor);
        // SAFETY: `process` holds an SBProcess.
        if !unsafe { (api.process_is_valid)(process.as_ptr()) } {
            return None;
        }

        let error = SbObject::construct(api.error_ctor, api.error_dtor);
        // SAFETY: `buffer` is writable for its full length; `error` is a live SBError.
        let count = unsafe {
            reader(process.as_ptr(), address, buffer.as_mut_ptr().cast(), buffer.len(), error.as_ptr())
        };
        // SAFETY: `error` holds an SBError.
        let success = unsafe { (api.error_success)(error.as_ptr()) };

        success.then_some(count)
    }
}

impl ValueHandle for SbValue
{
    fn child_member(&self, name: &str) -> Option<Self>
    {
        let name = CString::new(name).ok()?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        self.object(unsafe { (self.api.value_child_member)(self.as_ptr(), name.as_ptr()) })
    }

    fn child_at_index(&self, index: u32) -> Option<Self>
    {
        // SAFETY: plain SBValue member call.
        self.object(unsafe { (self.api.value_child_at_index)(self.as_ptr(), index) })
    }

    fn num_children(&self) -> u32
    {
        // SAFETY: plain SBValue member call.
        unsafe { (self.api.value_num_children)(self.as_ptr()) }
    }

    fn name(&self) -> Option<String>
    {
        self.text(self.api.value_name)
    }

    fn value(&self) -> Option<String>
    {
        self.text(self.api.value_value)
    }

    fn summary(&self) -> Option<String>
    {
        self.text(self.api.value_summary)
    }

    fn value_as_unsigned(&self) -> u64
    {
        // SAFETY: plain SBValue member call.
        unsafe { (self.api.value_as_unsigned)(self.as_ptr(), 0) }
    }

    fn type_name(&self) -> Option<String>
    {
        self.text(self.api.value_type_name)
    }

    fn is_pointer(&self) -> bool
    {
        // SAFETY: plain SBValue member call.
        unsafe { (self.api.value_type_is_pointer)(self.as_ptr()) }
    }

    fn dereference(&self) -> Option<Self>
    {
        // SAFETY: plain SBValue member call.
        self.object(unsafe { (self.api.value_dereference)(self.as_ptr()) })
    }

    fn read_memory(&self, address: u64, len: usize) -> Option<Vec<u8>>
    {
        let mut buffer = vec![0u8; len];
        let read = self.read(self.api.process_read_memory, address, &mut buffer)?;
        (read == len).then_some(buffer)
    }

    fn read_c_string(&self, address: u64, max_len: usize) -> Option<Vec<u8>>
    {
        let mut buffer = vec![0u8; max_len];
        let read = self.read(self.api.process_read_c_string, address, &mut buffer)?;
        if read == 0 {
            return None;
        }

        // The count is the string length; cut at the first NUL regardless.
        let end = buffer.iter().position(|byte| *byte == 0).unwrap_or(buffer.len()).min(read);
        buffer.truncate(end);
        Some(buffer)
    }
}

//! Owned and borrowed SB objects.

use std::cell::UnsafeCell;
use std::ffi::{CStr, c_char, c_void};
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use super::ffi::{Constructor, Destructor};

/// Raw storage for one SB object.
///
/// Every SB class the plugin touches is one or two pointers wide (a smart
/// pointer, sometimes with a flag). Four words fit all of them and make the
/// type large enough to be returned indirectly under the C ABI.
#[repr(C)]
pub struct SbStorage(UnsafeCell<[MaybeUninit<usize>; 4]>);

impl SbStorage
{
    fn zeroed() -> Self
    {
        Self(UnsafeCell::new([MaybeUninit::zeroed(); 4]))
    }

    fn as_mut_ptr(&self) -> *mut c_void
    {
        self.0.get().cast()
    }
}

struct Owned
{
    // Kept for its allocation; only reached through `SbObject::ptr`.
    _storage: Box<SbStorage>,
    destructor: Destructor,
}

/// An SB object: either owned by us (and destroyed on drop) or borrowed from
/// the host for the duration of a callback.
///
/// SB classes only hold smart pointers, so moving an owned one between
/// storage locations is safe.
pub struct SbObject
{
    ptr: NonNull<c_void>,
    owned: Option<Owned>,
}

impl SbObject
{
    /// Take ownership of an object a host function returned.
    pub(crate) fn from_returned(storage: SbStorage, destructor: Destructor) -> Self
    {
        let storage = Box::new(storage);
        let ptr = NonNull::new(storage.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self { ptr, owned: Some(Owned { _storage: storage, destructor }) }
    }

    /// Default-construct an object in fresh storage.
    pub(crate) fn construct(constructor: Constructor, destructor: Destructor) -> Self
    {
        let storage = Box::new(SbStorage::zeroed());
        // SAFETY: the storage is large enough and aligned for every SB class.
        unsafe { constructor(storage.as_mut_ptr()) };
        let ptr = NonNull::new(storage.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self { ptr, owned: Some(Owned { _storage: storage, destructor }) }
    }

    /// Wrap an object the host passed in. Nothing is destroyed on drop.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a live SB object that outlives the returned value.
    pub(crate) unsafe fn borrowed(ptr: *mut c_void) -> Option<Self>
    {
        NonNull::new(ptr).map(|ptr| Self { ptr, owned: None })
    }

    pub(crate) fn as_ptr(&self) -> *mut c_void
    {
        self.ptr.as_ptr()
    }
}

impl Drop for SbObject
{
    fn drop(&mut self)
    {
        if let Some(owned) = &self.owned {
            // SAFETY: the object was constructed or returned by the host and is
            // destroyed exactly once, here.
            unsafe { (owned.destructor)(self.ptr.as_ptr()) };
        }
    }
}

/// Copy a host C string, treating null and empty the same.
///
/// # Safety
///
/// `text` must be null or point at a NUL-terminated string.
pub(crate) unsafe fn host_text(text: *const c_char) -> Option<String>
{
    if text.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the contract above.
    let text = unsafe { CStr::from_ptr(text) }.to_string_lossy();
    (!text.is_empty()).then(|| text.into_owned())
}

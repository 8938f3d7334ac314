//! Typed device addresses.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;

/// An address in device memory.
///
/// `DevicePtr` is layout-compatible with `*mut T` so it can be handed to
/// device kernels across an FFI boundary, but it deliberately has no
/// dereference, indexing, or slice conversion: device memory is not
/// host-addressable, and the only way to touch its bytes from host code
/// is a copy through the runtime.
#[repr(transparent)]
pub struct DevicePtr<T> {
    raw: *mut T,
    _marker: PhantomData<*mut T>,
}

impl<T> DevicePtr<T> {
    /// The null device address.
    pub const fn null() -> Self {
        Self {
            raw: std::ptr::null_mut(),
            _marker: PhantomData,
        }
    }

    /// Wrap a raw device address.
    ///
    /// The runtime validates addresses on every copy, so wrapping an
    /// arbitrary value is not unsafe; it simply fails at copy time.
    pub const fn from_raw(raw: *mut T) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Whether this is the null address.
    pub fn is_null(self) -> bool {
        self.raw.is_null()
    }

    /// The address for read-only use by device code.
    pub fn as_raw(self) -> *const T {
        self.raw
    }

    /// The address for device code that writes.
    pub fn as_raw_mut(self) -> *mut T {
        self.raw
    }

    /// Numeric address, for registry lookups and diagnostics.
    pub fn addr(self) -> usize {
        self.raw as usize
    }

    /// Reinterpret as a pointer to a different element type.
    pub fn cast<U>(self) -> DevicePtr<U> {
        DevicePtr::from_raw(self.raw.cast())
    }
}

impl<T> Clone for DevicePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DevicePtr<T> {}

impl<T> PartialEq for DevicePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for DevicePtr<T> {}

impl<T> Default for DevicePtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for DevicePtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePtr({:#x})", self.addr())
    }
}

// SAFETY: a DevicePtr is an opaque address that host code can never
// dereference; moving or sharing it between threads cannot create a data
// race on host memory.
unsafe impl<T> Send for DevicePtr<T> {}
// SAFETY: see Send above.
unsafe impl<T> Sync for DevicePtr<T> {}

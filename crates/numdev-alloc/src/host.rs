//! Host-heap allocator strategy.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};

use log::{trace, warn};
use numdev_core::MemorySpace;

use crate::strategy::{Allocator, HostAllocator, BLOCK_ALIGN};

/// Allocates from the process heap.
///
/// Blocks are zero-initialised so every [`Element`](numdev_core::Element)
/// read from a fresh array is a valid value.
#[derive(Clone, Copy, Debug)]
pub enum HostHeap {}

impl Allocator for HostHeap {
    const SPACE: MemorySpace = MemorySpace::Host;

    fn allocate(bytes: usize) -> *mut u8 {
        if bytes == 0 {
            return std::ptr::null_mut();
        }
        let Ok(layout) = Layout::from_size_align(bytes, BLOCK_ALIGN) else {
            warn!("host allocation of {bytes} bytes exceeds the addressable range");
            return std::ptr::null_mut();
        };
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            warn!("host allocation of {bytes} bytes failed");
        } else {
            trace!("host alloc {bytes} bytes at {:#x}", ptr as usize);
        }
        ptr
    }

    unsafe fn free(ptr: *mut u8, bytes: usize) {
        if ptr.is_null() {
            return;
        }
        trace!("host free {bytes} bytes at {:#x}", ptr as usize);
        // SAFETY: per the trait contract `ptr` came from `allocate(bytes)`,
        // which used exactly this layout; it cannot fail for a size that
        // was accepted there.
        unsafe {
            let layout = Layout::from_size_align_unchecked(bytes, BLOCK_ALIGN);
            alloc::dealloc(ptr, layout);
        }
    }
}

impl HostAllocator for HostHeap {}

//! Instrumented and failing allocator strategies.

#![allow(unsafe_code)]

use std::cell::Cell;
use std::sync::Arc;

use numdev_alloc::{Allocator, DeviceAllocator, DeviceHeap, HostAllocator, HostHeap};
use numdev_core::MemorySpace;
use numdev_device::Device;

/// Allocation and release counts observed on the current thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocCounts {
    /// Successful (non-null) allocations.
    pub allocs: usize,
    /// Releases of non-null blocks.
    pub frees: usize,
}

thread_local! {
    static HOST: Cell<AllocCounts> = const { Cell::new(AllocCounts { allocs: 0, frees: 0 }) };
    static DEVICE: Cell<AllocCounts> = const { Cell::new(AllocCounts { allocs: 0, frees: 0 }) };
}

fn bump(cell: &'static std::thread::LocalKey<Cell<AllocCounts>>, f: impl FnOnce(&mut AllocCounts)) {
    cell.with(|c| {
        let mut counts = c.get();
        f(&mut counts);
        c.set(counts);
    });
}

/// Counts recorded by [`CountingHostHeap`] on this thread.
pub fn host_counts() -> AllocCounts {
    HOST.with(Cell::get)
}

pub fn reset_host_counts() {
    HOST.with(|c| c.set(AllocCounts::default()));
}

/// Counts recorded by [`CountingDeviceHeap`] on this thread.
pub fn device_counts() -> AllocCounts {
    DEVICE.with(Cell::get)
}

pub fn reset_device_counts() {
    DEVICE.with(|c| c.set(AllocCounts::default()));
}

/// [`HostHeap`] that records every allocation and release.
#[derive(Clone, Copy, Debug)]
pub enum CountingHostHeap {}

impl Allocator for CountingHostHeap {
    const SPACE: MemorySpace = MemorySpace::Host;

    fn allocate(bytes: usize) -> *mut u8 {
        let ptr = HostHeap::allocate(bytes);
        if !ptr.is_null() {
            bump(&HOST, |c| c.allocs += 1);
        }
        ptr
    }

    unsafe fn free(ptr: *mut u8, bytes: usize) {
        if !ptr.is_null() {
            bump(&HOST, |c| c.frees += 1);
        }
        // SAFETY: forwarded contract; blocks came from HostHeap::allocate.
        unsafe { HostHeap::free(ptr, bytes) }
    }
}

impl HostAllocator for CountingHostHeap {}

/// [`DeviceHeap`] that records every allocation and release.
#[derive(Clone, Copy, Debug)]
pub enum CountingDeviceHeap {}

impl Allocator for CountingDeviceHeap {
    const SPACE: MemorySpace = MemorySpace::Device;

    fn allocate(bytes: usize) -> *mut u8 {
        let ptr = DeviceHeap::allocate(bytes);
        if !ptr.is_null() {
            bump(&DEVICE, |c| c.allocs += 1);
        }
        ptr
    }

    unsafe fn free(ptr: *mut u8, bytes: usize) {
        if !ptr.is_null() {
            bump(&DEVICE, |c| c.frees += 1);
        }
        // SAFETY: forwarded contract; blocks came from DeviceHeap::allocate.
        unsafe { DeviceHeap::free(ptr, bytes) }
    }
}

impl DeviceAllocator for CountingDeviceHeap {
    fn device() -> &'static Arc<Device> {
        DeviceHeap::device()
    }
}

/// A host strategy that never has memory.
#[derive(Clone, Copy, Debug)]
pub enum NullHostHeap {}

impl Allocator for NullHostHeap {
    const SPACE: MemorySpace = MemorySpace::Host;

    fn allocate(_bytes: usize) -> *mut u8 {
        std::ptr::null_mut()
    }

    unsafe fn free(_ptr: *mut u8, _bytes: usize) {}
}

impl HostAllocator for NullHostHeap {}

/// A device strategy that never has memory.
#[derive(Clone, Copy, Debug)]
pub enum NullDeviceHeap {}

impl Allocator for NullDeviceHeap {
    const SPACE: MemorySpace = MemorySpace::Device;

    fn allocate(_bytes: usize) -> *mut u8 {
        std::ptr::null_mut()
    }

    unsafe fn free(_ptr: *mut u8, _bytes: usize) {}
}

impl DeviceAllocator for NullDeviceHeap {
    fn device() -> &'static Arc<Device> {
        DeviceHeap::device()
    }
}

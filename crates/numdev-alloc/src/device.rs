//! Device-heap allocator strategy.

#![allow(unsafe_code)]

use std::sync::Arc;

use log::{error, warn};
use numdev_core::MemorySpace;
use numdev_device::{Device, DevicePtr};

use crate::strategy::{Allocator, DeviceAllocator};

/// Allocates from the primary [`Device`].
///
/// Out-of-memory is reported as a null block (and a warning), never as
/// a panic.
#[derive(Clone, Copy, Debug)]
pub enum DeviceHeap {}

impl Allocator for DeviceHeap {
    const SPACE: MemorySpace = MemorySpace::Device;

    fn allocate(bytes: usize) -> *mut u8 {
        match Self::device().allocate(bytes) {
            Ok(ptr) => ptr.as_raw_mut(),
            Err(e) => {
                warn!("device allocation of {bytes} bytes failed: {e}");
                std::ptr::null_mut()
            }
        }
    }

    unsafe fn free(ptr: *mut u8, _bytes: usize) {
        if let Err(e) = Self::device().free(DevicePtr::from_raw(ptr)) {
            error!("device free rejected: {e}");
        }
    }
}

impl DeviceAllocator for DeviceHeap {
    fn device() -> &'static Arc<Device> {
        Device::primary()
    }
}

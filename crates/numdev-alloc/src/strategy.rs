//! The allocator strategy traits.

#![allow(unsafe_code)]

use std::sync::Arc;

use numdev_core::MemorySpace;
use numdev_device::Device;

/// Minimum alignment of every block handed out by a strategy.
///
/// Element types with a stricter alignment cannot be stored in arrays.
pub const BLOCK_ALIGN: usize = 64;

/// A stateless allocate/free pair for one memory space.
///
/// # Contract
///
/// - [`allocate`](Allocator::allocate) returns a zero-initialised block
///   of at least `bytes` bytes aligned to [`BLOCK_ALIGN`], or null when
///   the space cannot satisfy the request. A zero-byte request returns
///   null. Callers must check for null.
/// - [`free`](Allocator::free) releases a block. Null is a no-op.
pub trait Allocator: 'static {
    /// The memory space blocks from this strategy live in.
    const SPACE: MemorySpace;

    /// Allocate `bytes` bytes, returning null on failure.
    fn allocate(bytes: usize) -> *mut u8;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a block returned by `Self::allocate(bytes)`
    /// that has not been freed yet. Passing a block from another strategy
    /// or freeing twice is undefined behaviour.
    unsafe fn free(ptr: *mut u8, bytes: usize);
}

/// A strategy whose blocks are dereferenceable from host code.
pub trait HostAllocator: Allocator {}

/// A strategy whose blocks live on a device and are only reachable
/// through that device's copy primitives.
pub trait DeviceAllocator: Allocator {
    /// The device that owns this strategy's blocks.
    fn device() -> &'static Arc<Device>;
}

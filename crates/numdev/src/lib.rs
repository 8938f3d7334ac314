//! numdev: multi-dimensional arrays in host and device memory.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all numdev sub-crates. For most users, adding `numdev` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use numdev::prelude::*;
//!
//! let host = HostArray::<i32>::from_slice(&[3], &[1, 2, 3]).unwrap();
//!
//! // Upload; the empty destination is sized to match the source.
//! let mut dev = DeviceArray::<i32>::new();
//! host_to_device(&mut dev, &host).unwrap();
//! assert_eq!(dev.size(), &[3]);
//!
//! // Download into a host array of the wrong size; it is reallocated.
//! let mut back = HostArray::<i32>::new1(10);
//! device_to_host(&mut back, &dev).unwrap();
//! assert_eq!(back.as_slice(), &[1, 2, 3]);
//!
//! // The same round trip, queued on a stream.
//! let stream = Stream::new().unwrap();
//! let mut out = HostArray::<i32>::new();
//! // SAFETY: `dev` and `out` are not touched until the stream is synchronized.
//! unsafe { device_to_host_async(&mut out, &dev, &stream).unwrap() };
//! stream.synchronize().unwrap();
//! assert_eq!(out, host);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `numdev-core` | `Shape`, `Element`, memory spaces, shape errors |
//! | [`device`] | `numdev-device` | Device runtime, device pointers, streams, configuration |
//! | [`alloc`] | `numdev-alloc` | Allocator strategy traits, `HostHeap`, `DeviceHeap` |
//! | [`array`] | `numdev-array` | `BaseArray`, `HostArray`, `DeviceArray`, transfers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Shapes, element types, and memory spaces (`numdev-core`).
pub use numdev_core as types;

/// The device runtime (`numdev-device`).
///
/// [`device::Device`] owns device memory and performs copies;
/// [`device::Stream`] queues copies for in-order background execution.
pub use numdev_device as device;

/// Allocator strategies (`numdev-alloc`).
///
/// Implement [`alloc::HostAllocator`] or [`alloc::DeviceAllocator`] to plug
/// a custom memory source into the array types.
pub use numdev_alloc as alloc;

/// Arrays and transfers (`numdev-array`).
pub use numdev_array as array;

/// Common imports for typical numdev usage.
///
/// ```rust
/// use numdev::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use numdev_core::{Element, MemorySpace, Shape};

    // Device runtime
    pub use numdev_device::{Device, DeviceConfig, DevicePtr, Stream};

    // Strategies
    pub use numdev_alloc::{DeviceAllocator, DeviceHeap, HostAllocator, HostHeap};

    // Arrays
    pub use numdev_array::{BaseArray, DeviceArray, HostArray};

    // Transfers
    pub use numdev_array::{
        device_to_device, device_to_device_async, device_to_host, device_to_host_async,
        host_to_device, host_to_device_async,
    };

    // Errors
    pub use numdev_array::{ArrayError, TransferError};
    pub use numdev_core::ShapeError;
    pub use numdev_device::{ConfigError, DeviceError};
}

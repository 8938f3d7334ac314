//! Move-only host and device arrays with explicit transfers.
//!
//! # Architecture
//!
//! ```text
//! BaseArray<A: Allocator>        untyped block + Shape + element size
//! ├── HostArray<T, A = HostHeap>     element access, slices, indexing
//! └── DeviceArray<T, A = DeviceHeap> DevicePtr only, no host access
//!
//! transfer::{host_to_device, device_to_host, device_to_device}
//!   + *_async variants queued on a numdev_device::Stream
//! ```
//!
//! # Ownership
//!
//! Every array exclusively owns its block. Arrays are not `Clone`; moving
//! one transfers the block, and [`take`](HostArray::take) moves it out
//! while leaving an empty array behind. The block is released by the
//! strategy that allocated it, exactly once, when the owner drops.
//!
//! # Failure model
//!
//! The plain constructors (`new1`, `new2`, `with_shape`, ...) never panic
//! on allocation failure: they return an empty array and log a warning,
//! so callers check [`is_empty`](HostArray::is_empty). The `try_`
//! constructors and every transfer return a `Result` instead.
//!
//! # Zero-length shapes
//!
//! A shape with a zero dimension keeps its dimensions but holds a null
//! pointer and never calls the allocator.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod base;
pub mod device;
pub mod error;
pub mod host;
pub mod transfer;

pub use base::BaseArray;
pub use device::DeviceArray;
pub use error::{ArrayError, TransferError};
pub use host::HostArray;
pub use transfer::{
    device_to_device, device_to_device_async, device_to_host, device_to_host_async,
    host_to_device, host_to_device_async,
};

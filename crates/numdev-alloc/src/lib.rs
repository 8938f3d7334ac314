//! Allocator strategies for numdev arrays.
//!
//! An allocator strategy is a stateless pair of functions bound to one
//! [`MemorySpace`](numdev_core::MemorySpace). Strategies are types, never
//! values: arrays carry their strategy as a type parameter, so the strategy
//! that frees a block is always the one that allocated it, and the choice
//! costs no dynamic dispatch.
//!
//! | Strategy | Space | Backing |
//! |----------|-------|---------|
//! | [`HostHeap`] | host | process heap, zero-initialised |
//! | [`DeviceHeap`] | device | primary [`Device`](numdev_device::Device) |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod device;
pub mod host;
pub mod strategy;

pub use device::DeviceHeap;
pub use host::HostHeap;
pub use strategy::{Allocator, DeviceAllocator, HostAllocator, BLOCK_ALIGN};

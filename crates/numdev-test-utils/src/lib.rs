//! Test utilities for numdev development.
//!
//! Provides instrumented allocator strategies ([`CountingHostHeap`],
//! [`CountingDeviceHeap`]), strategies that always fail
//! ([`NullHostHeap`], [`NullDeviceHeap`]), and seeded data fixtures in
//! [`fixtures`].
//!
//! Counters are thread-local: each `#[test]` runs on its own thread, so
//! tests never observe each other's allocations.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod alloc;
pub mod fixtures;

pub use alloc::{
    device_counts, host_counts, reset_device_counts, reset_host_counts, AllocCounts,
    CountingDeviceHeap, CountingHostHeap, NullDeviceHeap, NullHostHeap,
};
pub use fixtures::{random_f32, random_i32, random_u8};

//! Device memory runtime for numdev arrays.
//!
//! This crate plays the role of the accelerator driver: it owns a
//! capacity-bounded device heap, performs synchronous block copies between
//! host and device memory, and runs asynchronous copies on ordered
//! [`Stream`]s. The array crates consume exactly four primitives from it:
//! allocate, free, synchronous copy, and stream-enqueued copy.
//!
//! # Architecture
//!
//! ```text
//! Device (Arc, one primary per process)
//! ├── DeviceConfig (capacity, stream queue depth)
//! ├── Mutex<DeviceHeap>
//! │   └── IndexMap<addr, bytes>   live blocks, insertion-ordered
//! └── Stream × N
//!     ├── crossbeam bounded Sender<StreamOp>
//!     └── worker thread  executes ops in FIFO order
//! ```
//!
//! Device memory is never handed to host code as a reference. Addresses
//! travel as [`DevicePtr`], which has no dereference operation; the only
//! way to read or write device bytes is a copy through [`Device`] or a
//! [`Stream`].
//!
//! Copies hold the heap lock while touching device bytes, so a block can
//! not be released underneath an in-flight copy. Host-side buffers get no
//! such protection: keeping them alive and untouched until a stream is
//! synchronized is the caller's obligation, which is why every copy entry
//! point is `unsafe`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod device;
pub mod error;
pub mod ptr;
pub mod stream;

pub use config::{ConfigError, DeviceConfig};
pub use device::{Device, DEVICE_ALIGN};
pub use error::DeviceError;
pub use ptr::DevicePtr;
pub use stream::{Stream, StreamId};

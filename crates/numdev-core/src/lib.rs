//! Core types for the numdev array workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the device runtime, the allocator strategies, and
//! the arrays themselves: shapes, memory spaces, copy directions, and the
//! [`Element`] marker for types that may live in raw byte blocks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod element;
pub mod error;
pub mod shape;
pub mod space;

pub use element::Element;
pub use error::ShapeError;
pub use shape::{Dims, Shape, MAX_RANK};
pub use space::{CopyKind, MemorySpace};

//! The untyped, exclusively-owned array block.
//!
//! [`BaseArray`] knows an element size, a [`Shape`], and a block of
//! `element_size * shape.len()` bytes obtained from its allocator strategy
//! `A`. It is the single place that allocates and releases array memory;
//! the typed wrappers only reinterpret it.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;

use log::{debug, trace, warn};
use numdev_alloc::Allocator;
use numdev_core::{MemorySpace, Shape};

use crate::error::ArrayError;

/// An untyped block of memory with a shape, owned exclusively.
///
/// Not `Clone`: two `BaseArray`s never share a block. The block is freed
/// through `A` exactly once, when the owner is dropped or replaced.
pub struct BaseArray<A: Allocator> {
    ptr: *mut u8,
    element_size: usize,
    shape: Shape,
    _strategy: PhantomData<fn() -> A>,
}

// SAFETY: the block is owned exclusively and only reachable through
// `&self`/`&mut self`, the same discipline as `Vec<u8>`.
unsafe impl<A: Allocator> Send for BaseArray<A> {}
// SAFETY: shared access only hands out `*const` views; see Send above.
unsafe impl<A: Allocator> Sync for BaseArray<A> {}

impl<A: Allocator> BaseArray<A> {
    /// An empty array with no block and the rank-0 shape.
    pub fn new(element_size: usize) -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            element_size,
            shape: Shape::empty(),
            _strategy: PhantomData,
        }
    }

    /// Allocate a block for `shape`.
    ///
    /// On allocation failure the result is empty (see
    /// [`is_empty`](Self::is_empty)) and a warning is logged.
    pub fn with_shape(element_size: usize, shape: Shape) -> Self {
        Self::try_with_shape(element_size, shape).unwrap_or_else(|e| {
            warn!("array construction failed, returning empty array: {e}");
            Self::new(element_size)
        })
    }

    /// Allocate a block for `shape`, reporting failure.
    ///
    /// A zero-length shape keeps its dimensions and allocates nothing.
    pub fn try_with_shape(element_size: usize, shape: Shape) -> Result<Self, ArrayError> {
        let bytes = shape.byte_size(element_size)?;
        if bytes == 0 {
            return Ok(Self {
                ptr: std::ptr::null_mut(),
                element_size,
                shape,
                _strategy: PhantomData,
            });
        }
        let ptr = A::allocate(bytes);
        if ptr.is_null() {
            return Err(ArrayError::AllocationFailed {
                space: A::SPACE,
                bytes,
            });
        }
        trace!("{} array {shape} allocated ({bytes} bytes)", A::SPACE);
        Ok(Self {
            ptr,
            element_size,
            shape,
            _strategy: PhantomData,
        })
    }

    /// Allocate from 1 to 3 dimension sizes; empty on any failure.
    pub fn with_dims(element_size: usize, dims: &[usize]) -> Self {
        match Shape::new(dims) {
            Ok(shape) => Self::with_shape(element_size, shape),
            Err(e) => {
                warn!("array construction failed, returning empty array: {e}");
                Self::new(element_size)
            }
        }
    }

    /// Allocate from 1 to 3 dimension sizes, reporting failure.
    pub fn try_with_dims(element_size: usize, dims: &[usize]) -> Result<Self, ArrayError> {
        Self::try_with_shape(element_size, Shape::new(dims)?)
    }

    /// Move the block out, leaving `self` empty with the same element size.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::new(self.element_size))
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// The dimension sizes, in order. Empty for a default array.
    pub fn size(&self) -> &[usize] {
        self.shape.dims()
    }

    /// The full shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// Whether the array holds no elements (and therefore no block).
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    /// `element_size * len` in bytes.
    pub fn byte_size(&self) -> usize {
        if self.ptr.is_null() {
            0
        } else {
            self.element_size * self.shape.len()
        }
    }

    /// The memory space of the block.
    pub fn space(&self) -> MemorySpace {
        A::SPACE
    }

    /// Start of the block, or null when empty.
    ///
    /// Valid only while `self` is alive and not reallocated.
    pub fn raw_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Mutable start of the block, or null when empty.
    pub fn raw_ptr_mut(&mut self) -> *mut u8 {
        self.ptr
    }

    /// Make `self` hold exactly `shape.len()` elements, keeping the block
    /// when the element count already matches.
    ///
    /// Returns `true` when a new block was allocated. On failure `self` is
    /// left empty.
    pub(crate) fn conform_to(&mut self, shape: &Shape) -> Result<bool, ArrayError> {
        if self.shape == *shape {
            return Ok(false);
        }
        if self.shape.len() == shape.len() {
            self.shape = shape.clone();
            return Ok(false);
        }
        debug!(
            "{} array reallocating {} -> {}",
            A::SPACE,
            self.shape,
            shape
        );
        // Release before allocating so a failed request leaves us empty.
        *self = Self::new(self.element_size);
        *self = Self::try_with_shape(self.element_size, shape.clone())?;
        Ok(true)
    }
}

impl<A: Allocator> Drop for BaseArray<A> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let bytes = self.element_size * self.shape.len();
        trace!("{} array {} released ({bytes} bytes)", A::SPACE, self.shape);
        // SAFETY: a non-null ptr was returned by A::allocate(bytes) in
        // try_with_shape and is owned exclusively by self; drop runs once.
        unsafe { A::free(self.ptr, bytes) };
    }
}

impl<A: Allocator> fmt::Debug for BaseArray<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseArray")
            .field("space", &A::SPACE)
            .field("element_size", &self.element_size)
            .field("shape", &self.shape)
            .field("ptr", &self.ptr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numdev_alloc::HostHeap;
    use numdev_core::ShapeError;
    use numdev_test_utils::{host_counts, reset_host_counts, CountingHostHeap, NullHostHeap};

    #[test]
    fn empty_array_has_null_pointer() {
        let a: BaseArray<HostHeap> = BaseArray::new(4);
        assert!(a.is_empty());
        assert!(a.raw_ptr().is_null());
        assert_eq!(a.len(), 0);
        assert_eq!(a.byte_size(), 0);
        assert!(a.size().is_empty());
        assert_eq!(a.element_size(), 4);
    }

    #[test]
    fn dims_product_and_byte_size() {
        let a: BaseArray<HostHeap> = BaseArray::with_dims(8, &[2, 3, 4]);
        assert!(!a.is_empty());
        assert!(!a.raw_ptr().is_null());
        assert_eq!(a.size(), &[2, 3, 4]);
        assert_eq!(a.len(), 24);
        assert_eq!(a.byte_size(), 192);
        assert_eq!(a.space(), MemorySpace::Host);
    }

    #[test]
    fn invalid_rank_yields_empty() {
        let a: BaseArray<HostHeap> = BaseArray::with_dims(4, &[1, 2, 3, 4]);
        assert!(a.is_empty());
        assert!(a.size().is_empty());
        let err = BaseArray::<HostHeap>::try_with_dims(4, &[]).unwrap_err();
        assert_eq!(err, ArrayError::Shape(ShapeError::InvalidRank { rank: 0 }));
    }

    #[test]
    fn zero_dimension_keeps_dims_without_allocating() {
        reset_host_counts();
        let a: BaseArray<CountingHostHeap> = BaseArray::with_dims(4, &[3, 0]);
        assert!(a.is_empty());
        assert!(a.raw_ptr().is_null());
        assert_eq!(a.size(), &[3, 0]);
        assert_eq!(a.len(), 0);
        drop(a);
        let counts = host_counts();
        assert_eq!(counts.allocs, 0);
        assert_eq!(counts.frees, 0);
    }

    #[test]
    fn allocation_failure_leaves_empty() {
        let a: BaseArray<NullHostHeap> = BaseArray::with_dims(4, &[10]);
        assert!(a.is_empty());
        assert!(a.size().is_empty());
        let err = BaseArray::<NullHostHeap>::try_with_dims(4, &[10]).unwrap_err();
        assert_eq!(
            err,
            ArrayError::AllocationFailed {
                space: MemorySpace::Host,
                bytes: 40
            }
        );
    }

    #[test]
    fn byte_size_overflow_is_reported() {
        let err = BaseArray::<HostHeap>::try_with_dims(16, &[usize::MAX / 2]).unwrap_err();
        assert_eq!(err, ArrayError::Shape(ShapeError::ElementCountOverflow));
    }

    #[test]
    fn take_moves_block_and_empties_source() {
        let mut a: BaseArray<HostHeap> = BaseArray::with_dims(4, &[5]);
        let ptr = a.raw_ptr();
        let b = a.take();
        assert!(a.is_empty());
        assert!(a.size().is_empty());
        assert_eq!(a.element_size(), 4);
        assert_eq!(b.raw_ptr(), ptr);
        assert_eq!(b.size(), &[5]);
    }

    #[test]
    fn drop_frees_exactly_once() {
        reset_host_counts();
        {
            let mut a: BaseArray<CountingHostHeap> = BaseArray::with_dims(4, &[5]);
            let _b = a.take();
        }
        let counts = host_counts();
        assert_eq!(counts.allocs, 1);
        assert_eq!(counts.frees, 1);
    }

    #[test]
    fn assignment_releases_previous_block() {
        reset_host_counts();
        let mut a: BaseArray<CountingHostHeap> = BaseArray::with_dims(4, &[9]);
        let b: BaseArray<CountingHostHeap> = BaseArray::with_dims(4, &[4]);
        let b_ptr = b.raw_ptr();
        a = b;
        assert_eq!(host_counts().frees, 1);
        assert_eq!(a.raw_ptr(), b_ptr);
        assert_eq!(a.size(), &[4]);
        drop(a);
        assert_eq!(host_counts().frees, 2);
    }

    #[test]
    fn conform_same_count_reshapes_in_place() {
        let mut a: BaseArray<HostHeap> = BaseArray::with_dims(4, &[2, 3]);
        let ptr = a.raw_ptr();
        let realloc = a.conform_to(&Shape::d2(3, 2).unwrap()).unwrap();
        assert!(!realloc);
        assert_eq!(a.raw_ptr(), ptr);
        assert_eq!(a.size(), &[3, 2]);
    }

    #[test]
    fn conform_different_count_reallocates() {
        reset_host_counts();
        let mut a: BaseArray<CountingHostHeap> = BaseArray::with_dims(4, &[9]);
        let realloc = a.conform_to(&Shape::d1(4)).unwrap();
        assert!(realloc);
        assert_eq!(a.size(), &[4]);
        let counts = host_counts();
        assert_eq!(counts.allocs, 2);
        assert_eq!(counts.frees, 1);
    }

    #[test]
    fn conform_to_empty_shape_releases() {
        let mut a: BaseArray<HostHeap> = BaseArray::with_dims(4, &[9]);
        a.conform_to(&Shape::empty()).unwrap();
        assert!(a.is_empty());
        assert!(a.size().is_empty());
    }

    #[test]
    fn dropping_empty_arrays_frees_nothing() {
        reset_host_counts();
        {
            let _a: BaseArray<CountingHostHeap> = BaseArray::new(4);
            let _b: BaseArray<CountingHostHeap> = BaseArray::new(4);
        }
        assert_eq!(host_counts().frees, 0);
    }
}

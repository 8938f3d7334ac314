//! Host-resident typed arrays.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use numdev_alloc::{HostAllocator, HostHeap, BLOCK_ALIGN};
use numdev_core::{Element, Shape};

use crate::base::BaseArray;
use crate::error::ArrayError;

/// A typed array in host memory.
///
/// Elements are laid out row-major. Element access goes through slices
/// ([`as_slice`](Self::as_slice)), flat indexing (`a[i]`), or
/// multi-dimensional indexing (`a[[r, c]]`, `a[[z, y, x]]`).
///
/// ```
/// use numdev_array::HostArray;
///
/// let mut a = HostArray::<i32>::new2(2, 3);
/// a[[1, 2]] = 7;
/// assert_eq!(a.as_slice(), &[0, 0, 0, 0, 0, 7]);
/// ```
pub struct HostArray<T: Element, A: HostAllocator = HostHeap> {
    base: BaseArray<A>,
    _element: PhantomData<T>,
}

impl<T: Element, A: HostAllocator> HostArray<T, A> {
    const LAYOUT_OK: () = assert!(
        std::mem::size_of::<T>() > 0 && std::mem::align_of::<T>() <= BLOCK_ALIGN,
        "element type must be sized and aligned to at most BLOCK_ALIGN"
    );

    fn from_base(base: BaseArray<A>) -> Self {
        let () = Self::LAYOUT_OK;
        Self {
            base,
            _element: PhantomData,
        }
    }

    /// An empty array.
    pub fn new() -> Self {
        Self::from_base(BaseArray::new(std::mem::size_of::<T>()))
    }

    /// A zero-filled rank-1 array; empty on any failure.
    pub fn new1(d0: usize) -> Self {
        Self::from_base(BaseArray::with_dims(std::mem::size_of::<T>(), &[d0]))
    }

    /// A zero-filled rank-2 array; empty on any failure.
    pub fn new2(d0: usize, d1: usize) -> Self {
        Self::from_base(BaseArray::with_dims(std::mem::size_of::<T>(), &[d0, d1]))
    }

    /// A zero-filled rank-3 array; empty on any failure.
    pub fn new3(d0: usize, d1: usize, d2: usize) -> Self {
        Self::from_base(BaseArray::with_dims(
            std::mem::size_of::<T>(),
            &[d0, d1, d2],
        ))
    }

    /// A zero-filled array of `shape`; empty on allocation failure.
    pub fn with_shape(shape: Shape) -> Self {
        Self::from_base(BaseArray::with_shape(std::mem::size_of::<T>(), shape))
    }

    /// A zero-filled array of `shape`, reporting failure.
    pub fn try_with_shape(shape: Shape) -> Result<Self, ArrayError> {
        BaseArray::try_with_shape(std::mem::size_of::<T>(), shape).map(Self::from_base)
    }

    /// An array of `dims` filled with `value`.
    pub fn from_elem(dims: &[usize], value: T) -> Result<Self, ArrayError> {
        let mut a = Self::try_with_shape(Shape::new(dims)?)?;
        a.fill(value);
        Ok(a)
    }

    /// An array of `dims` holding a copy of `data` in row-major order.
    pub fn from_slice(dims: &[usize], data: &[T]) -> Result<Self, ArrayError> {
        let shape = Shape::new(dims)?;
        if shape.len() != data.len() {
            return Err(ArrayError::LengthMismatch {
                expected: shape.len(),
                actual: data.len(),
            });
        }
        let mut a = Self::try_with_shape(shape)?;
        a.as_mut_slice().copy_from_slice(data);
        Ok(a)
    }

    /// Move the contents out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        Self::from_base(self.base.take())
    }

    /// The dimension sizes, in order.
    pub fn size(&self) -> &[usize] {
        self.base.size()
    }

    /// The full shape.
    pub fn shape(&self) -> &Shape {
        self.base.shape()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Whether the array holds no block.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Size of the block in bytes.
    pub fn byte_size(&self) -> usize {
        self.base.byte_size()
    }

    /// The untyped array underneath.
    pub fn base(&self) -> &BaseArray<A> {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut BaseArray<A> {
        &mut self.base
    }

    /// Pointer to the first element, or null when empty.
    pub fn as_ptr(&self) -> *const T {
        self.base.raw_ptr().cast()
    }

    /// Mutable pointer to the first element, or null when empty.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.base.raw_ptr_mut().cast()
    }

    /// The elements as a slice (empty when the array is empty).
    pub fn as_slice(&self) -> &[T] {
        if self.base.is_empty() {
            return &[];
        }
        // SAFETY: a non-empty base owns a zero-initialised or written block
        // of len() elements of T, aligned to BLOCK_ALIGN >= align_of::<T>(),
        // and every bit pattern is a valid T (Element contract).
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.base.is_empty() {
            return &mut [];
        }
        let len = self.len();
        // SAFETY: as in as_slice; `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
    }

    /// Iterate over elements in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterate mutably over elements in row-major order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    /// Element at a multi-dimensional index, or `None` if out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        let i = self.shape().flat_index(index)?;
        self.as_slice().get(i)
    }

    /// Mutable element at a multi-dimensional index.
    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        let i = self.shape().flat_index(index)?;
        self.as_mut_slice().get_mut(i)
    }

    /// Copy the elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    fn flat_or_panic(&self, index: &[usize]) -> usize {
        match self.shape().flat_index(index) {
            Some(i) => i,
            None => panic!(
                "index {index:?} out of bounds for array of shape {}",
                self.shape()
            ),
        }
    }
}

impl<T: Element, A: HostAllocator> Default for HostArray<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, A: HostAllocator> Index<usize> for HostArray<T, A> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

impl<T: Element, A: HostAllocator> IndexMut<usize> for HostArray<T, A> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.as_mut_slice()[i]
    }
}

macro_rules! impl_multi_index {
    ($($n:literal),*) => {
        $(
            impl<T: Element, A: HostAllocator> Index<[usize; $n]> for HostArray<T, A> {
                type Output = T;

                fn index(&self, index: [usize; $n]) -> &T {
                    let i = self.flat_or_panic(&index);
                    &self.as_slice()[i]
                }
            }

            impl<T: Element, A: HostAllocator> IndexMut<[usize; $n]> for HostArray<T, A> {
                fn index_mut(&mut self, index: [usize; $n]) -> &mut T {
                    let i = self.flat_or_panic(&index);
                    &mut self.as_mut_slice()[i]
                }
            }
        )*
    };
}

impl_multi_index!(2, 3);

impl<T, A, B> PartialEq<HostArray<T, B>> for HostArray<T, A>
where
    T: Element + PartialEq,
    A: HostAllocator,
    B: HostAllocator,
{
    fn eq(&self, other: &HostArray<T, B>) -> bool {
        self.size() == other.size() && self.as_slice() == other.as_slice()
    }
}

impl<T: Element + fmt::Debug, A: HostAllocator> fmt::Debug for HostArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("shape", self.shape())
            .field("data", &self.as_slice())
            .finish()
    }
}

impl<'a, T: Element, A: HostAllocator> IntoIterator for &'a HostArray<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

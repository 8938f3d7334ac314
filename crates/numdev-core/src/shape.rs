//! Dimension bookkeeping for arrays of rank 1 to 3.
//!
//! A [`Shape`] is the ordered list of dimension sizes plus the cached
//! element count. Layout is row-major: the last listed dimension is
//! contiguous in memory, so `[rows, cols]` places `(r, c)` at
//! `r * cols + c`.

use smallvec::SmallVec;
use std::fmt;

use crate::error::ShapeError;

/// Highest rank an array may have.
pub const MAX_RANK: usize = 3;

/// Inline storage for dimension sizes or strides.
pub type Dims = SmallVec<[usize; MAX_RANK]>;

/// Ordered dimension sizes and the element count they imply.
///
/// The rank-0 shape ([`Shape::empty`]) describes a default-constructed
/// array. Any other shape has between 1 and [`MAX_RANK`] dimensions; a
/// zero in any of them yields a zero-length shape that still reports the
/// requested dimensions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Dims,
    len: usize,
}

impl Shape {
    /// The rank-0 shape of an empty array.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a shape from 1 to [`MAX_RANK`] dimension sizes.
    ///
    /// Fails if the rank is out of range or the element count overflows.
    pub fn new(dims: &[usize]) -> Result<Self, ShapeError> {
        if dims.is_empty() || dims.len() > MAX_RANK {
            return Err(ShapeError::InvalidRank { rank: dims.len() });
        }
        let len = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(ShapeError::ElementCountOverflow)?;
        Ok(Self {
            dims: SmallVec::from_slice(dims),
            len,
        })
    }

    /// A rank-1 shape. Cannot fail.
    pub fn d1(n: usize) -> Self {
        let mut dims = Dims::new();
        dims.push(n);
        Self { dims, len: n }
    }

    /// A rank-2 shape.
    pub fn d2(d0: usize, d1: usize) -> Result<Self, ShapeError> {
        Self::new(&[d0, d1])
    }

    /// A rank-3 shape.
    pub fn d3(d0: usize, d1: usize, d2: usize) -> Result<Self, ShapeError> {
        Self::new(&[d0, d1, d2])
    }

    /// Number of dimensions (0 for the empty shape).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// The dimension sizes in order.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Size of one dimension, or `None` if `axis >= rank`.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// Total number of elements (product of the dimensions).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the shape holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte size of a block holding this shape's elements.
    pub fn byte_size(&self, element_size: usize) -> Result<usize, ShapeError> {
        self.len
            .checked_mul(element_size)
            .ok_or(ShapeError::ElementCountOverflow)
    }

    /// Row-major strides in elements.
    pub fn strides(&self) -> Dims {
        let mut strides: Dims = SmallVec::from_elem(0, self.dims.len());
        let mut acc = 1usize;
        for (stride, &d) in strides.iter_mut().zip(&self.dims).rev() {
            *stride = acc;
            acc = acc.saturating_mul(d);
        }
        strides
    }

    /// Flat element offset of a multi-dimensional index.
    ///
    /// Returns `None` if the index rank differs from the shape rank or any
    /// coordinate is out of bounds.
    pub fn flat_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dims.len() || self.dims.is_empty() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &d) in index.iter().zip(&self.dims) {
            if i >= d {
                return None;
            }
            offset = offset * d + i;
        }
        Some(offset)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, "×")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl TryFrom<&[usize]> for Shape {
    type Error = ShapeError;

    fn try_from(dims: &[usize]) -> Result<Self, Self::Error> {
        Self::new(dims)
    }
}

impl<const N: usize> TryFrom<[usize; N]> for Shape {
    type Error = ShapeError;

    fn try_from(dims: [usize; N]) -> Result<Self, Self::Error> {
        Self::new(&dims)
    }
}

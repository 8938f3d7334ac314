//! Shape validation errors.

use std::error::Error;
use std::fmt;

use crate::shape::MAX_RANK;

/// Errors produced while building a [`Shape`](crate::Shape).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// The dimension list had fewer than one or more than [`MAX_RANK`] entries.
    InvalidRank {
        /// Number of dimensions supplied.
        rank: usize,
    },
    /// The product of the dimensions (or the resulting byte size) does not
    /// fit in `usize`.
    ElementCountOverflow,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRank { rank } => {
                write!(f, "rank {rank} is outside the supported range 1..={MAX_RANK}")
            }
            Self::ElementCountOverflow => write!(f, "element count overflows usize"),
        }
    }
}

impl Error for ShapeError {}

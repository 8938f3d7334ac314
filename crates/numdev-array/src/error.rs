//! Array and transfer error types.

use std::error::Error;
use std::fmt;

use numdev_core::{MemorySpace, ShapeError};
use numdev_device::{DeviceError, StreamId};

/// Errors from constructing or reshaping an array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// The requested shape is invalid.
    Shape(ShapeError),
    /// The memory space could not provide the block.
    AllocationFailed {
        /// Space the allocation was requested from.
        space: MemorySpace,
        /// Bytes requested.
        bytes: usize,
    },
    /// Initial data does not match the shape's element count.
    LengthMismatch {
        /// Element count implied by the shape.
        expected: usize,
        /// Number of elements supplied.
        actual: usize,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(e) => write!(f, "shape: {e}"),
            Self::AllocationFailed { space, bytes } => {
                write!(f, "{space} allocation of {bytes} bytes failed")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} elements, got {actual}")
            }
        }
    }
}

impl Error for ArrayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for ArrayError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

/// Errors from a transfer between arrays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferError {
    /// The destination had to be reallocated and the allocation failed.
    /// The destination is left empty and nothing was copied.
    Reallocation(ArrayError),
    /// The device runtime rejected the copy.
    Device(DeviceError),
    /// Source and destination live on different devices.
    DeviceMismatch,
    /// The stream belongs to a different device than the device array.
    StreamDeviceMismatch {
        /// The offending stream.
        stream: StreamId,
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reallocation(e) => write!(f, "destination reallocation failed: {e}"),
            Self::Device(e) => write!(f, "device: {e}"),
            Self::DeviceMismatch => write!(f, "source and destination are on different devices"),
            Self::StreamDeviceMismatch { stream } => {
                write!(f, "stream {stream} belongs to another device")
            }
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Reallocation(e) => Some(e),
            Self::Device(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for TransferError {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = ArrayError::AllocationFailed {
            space: MemorySpace::Device,
            bytes: 64,
        };
        assert_eq!(e.to_string(), "device allocation of 64 bytes failed");
        let t = TransferError::Reallocation(e);
        assert_eq!(
            t.to_string(),
            "destination reallocation failed: device allocation of 64 bytes failed"
        );
    }

    #[test]
    fn source_chain() {
        let t = TransferError::Reallocation(ArrayError::Shape(ShapeError::ElementCountOverflow));
        let inner = t.source().unwrap();
        assert_eq!(inner.to_string(), "shape: element count overflows usize");
        assert!(inner.source().is_some());
    }
}

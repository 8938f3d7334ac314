//! Device runtime error types.

use std::error::Error;
use std::fmt;

/// Errors reported by the device runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceError {
    /// The device heap cannot satisfy an allocation.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes still free on the device.
        available: usize,
    },
    /// An address passed as device memory is not inside any live block.
    InvalidDevicePointer {
        /// The offending address.
        addr: usize,
    },
    /// A copy range starts inside a live block but runs past its end.
    CopyOutOfBounds {
        /// Start of the requested range.
        addr: usize,
        /// Length of the requested range in bytes.
        bytes: usize,
        /// Size of the block that contains `addr`.
        block: usize,
    },
    /// The stream's worker has shut down and accepts no more work.
    StreamClosed,
    /// The stream's worker thread panicked.
    StreamWorkerPanicked,
    /// A stream worker thread could not be spawned.
    StreamSpawnFailed {
        /// Description from the OS.
        reason: String,
    },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                available,
            } => {
                write!(
                    f,
                    "device out of memory: requested {requested} bytes, {available} bytes available"
                )
            }
            Self::InvalidDevicePointer { addr } => {
                write!(f, "address {addr:#x} is not a live device allocation")
            }
            Self::CopyOutOfBounds { addr, bytes, block } => {
                write!(
                    f,
                    "copy of {bytes} bytes at {addr:#x} overruns its {block}-byte device block"
                )
            }
            Self::StreamClosed => write!(f, "stream is closed"),
            Self::StreamWorkerPanicked => write!(f, "stream worker panicked"),
            Self::StreamSpawnFailed { reason } => {
                write!(f, "stream worker spawn failed: {reason}")
            }
        }
    }
}

impl Error for DeviceError {}

//! Memory spaces and copy directions.

use std::fmt;

/// A distinct address space that a block of memory can live in.
///
/// Pointers from different spaces are never interchangeable: a host
/// pointer cannot be handed to device copies as a device address, and a
/// device pointer must never be dereferenced by host code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemorySpace {
    /// Ordinary process heap, dereferenceable from host code.
    Host,
    /// Accelerator memory, reachable only through the device runtime.
    Device,
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Device => write!(f, "device"),
        }
    }
}

/// Direction of a raw block copy, named by source and destination space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CopyKind {
    /// Host source, device destination.
    HostToDevice,
    /// Device source, host destination.
    DeviceToHost,
    /// Both ends in device memory.
    DeviceToDevice,
}

impl CopyKind {
    /// Space the copy reads from.
    pub fn src_space(self) -> MemorySpace {
        match self {
            Self::HostToDevice => MemorySpace::Host,
            Self::DeviceToHost | Self::DeviceToDevice => MemorySpace::Device,
        }
    }

    /// Space the copy writes to.
    pub fn dst_space(self) -> MemorySpace {
        match self {
            Self::DeviceToHost => MemorySpace::Host,
            Self::HostToDevice | Self::DeviceToDevice => MemorySpace::Device,
        }
    }
}

impl fmt::Display for CopyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostToDevice => write!(f, "host->device"),
            Self::DeviceToHost => write!(f, "device->host"),
            Self::DeviceToDevice => write!(f, "device->device"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_kind_spaces() {
        assert_eq!(CopyKind::HostToDevice.src_space(), MemorySpace::Host);
        assert_eq!(CopyKind::HostToDevice.dst_space(), MemorySpace::Device);
        assert_eq!(CopyKind::DeviceToHost.src_space(), MemorySpace::Device);
        assert_eq!(CopyKind::DeviceToHost.dst_space(), MemorySpace::Host);
        assert_eq!(CopyKind::DeviceToDevice.src_space(), MemorySpace::Device);
        assert_eq!(CopyKind::DeviceToDevice.dst_space(), MemorySpace::Device);
    }

    #[test]
    fn display_names() {
        assert_eq!(MemorySpace::Host.to_string(), "host");
        assert_eq!(CopyKind::DeviceToHost.to_string(), "device->host");
    }
}

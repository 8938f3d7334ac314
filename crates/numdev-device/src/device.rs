//! The device heap and synchronous copies.
//!
//! [`Device`] owns every block of device memory it hands out, keyed by
//! address in an insertion-ordered registry. Because the registry knows
//! each block's size, `free` needs only the address, double frees and
//! foreign addresses are reported instead of corrupting the heap, and
//! every copy can check that its device-side range lies inside a live
//! block.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use indexmap::IndexMap;
use log::{debug, trace, warn};
use numdev_core::{CopyKind, MemorySpace};

use crate::config::{ConfigError, DeviceConfig};
use crate::error::DeviceError;
use crate::ptr::DevicePtr;
use crate::stream::Stream;

/// Alignment of every device block, matching the guarantee accelerator
/// drivers give for their allocations.
pub const DEVICE_ALIGN: usize = 256;

static PRIMARY: OnceLock<Arc<Device>> = OnceLock::new();

/// Live allocations and the running byte total.
#[derive(Default)]
struct DeviceHeap {
    /// Maps block start address to the layout it was allocated with.
    blocks: IndexMap<usize, Layout>,
    used: usize,
}

impl DeviceHeap {
    /// Check that `[addr, addr + bytes)` lies inside one live block.
    fn check_range(&self, addr: usize, bytes: usize) -> Result<(), DeviceError> {
        let (offset, block) = match self.blocks.get(&addr) {
            Some(layout) => (0, layout.size()),
            None => self
                .blocks
                .iter()
                .find(|&(&start, layout)| addr > start && addr - start < layout.size())
                .map(|(&start, layout)| (addr - start, layout.size()))
                .ok_or(DeviceError::InvalidDevicePointer { addr })?,
        };
        match offset.checked_add(bytes) {
            Some(end) if end <= block => Ok(()),
            _ => Err(DeviceError::CopyOutOfBounds { addr, bytes, block }),
        }
    }
}

/// An accelerator memory space with a bounded heap.
///
/// Most code uses the process-wide [`Device::primary`]; tests and tools
/// can create independent devices with [`Device::new`].
pub struct Device {
    config: DeviceConfig,
    heap: Mutex<DeviceHeap>,
}

impl Device {
    /// Create a standalone device.
    pub fn new(config: DeviceConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: DeviceConfig) -> Arc<Self> {
        debug!(
            "device created: capacity {} bytes, stream queue depth {}",
            config.capacity_bytes, config.stream_queue_depth
        );
        Arc::new(Self {
            config,
            heap: Mutex::new(DeviceHeap::default()),
        })
    }

    /// The process-wide device.
    ///
    /// Created on first use from [`DeviceConfig::from_env`]. A malformed
    /// environment override is logged and replaced by the defaults.
    pub fn primary() -> &'static Arc<Device> {
        PRIMARY.get_or_init(|| {
            let config = DeviceConfig::from_env().unwrap_or_else(|e| {
                warn!("ignoring device environment override: {e}");
                DeviceConfig::default()
            });
            // from_env validates; the defaults are valid.
            Self::with_valid_config(config)
        })
    }

    /// Create the primary device with an explicit configuration.
    ///
    /// Must run before anything touches [`Device::primary`]; afterwards it
    /// returns [`ConfigError::AlreadyInitialized`].
    pub fn init_primary(config: DeviceConfig) -> Result<&'static Arc<Device>, ConfigError> {
        let device = Self::new(config)?;
        PRIMARY
            .set(device)
            .map_err(|_| ConfigError::AlreadyInitialized)?;
        Ok(Self::primary())
    }

    /// The configuration this device was created with.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Total bytes the heap may hand out.
    pub fn capacity_bytes(&self) -> usize {
        self.config.capacity_bytes
    }

    /// Bytes currently allocated.
    pub fn used_bytes(&self) -> usize {
        self.heap().used
    }

    /// Bytes still available for allocation.
    pub fn available_bytes(&self) -> usize {
        self.config.capacity_bytes - self.heap().used
    }

    /// Snapshot of live blocks `(address, bytes)` in allocation order.
    pub fn live_blocks(&self) -> Vec<(DevicePtr<u8>, usize)> {
        self.heap()
            .blocks
            .iter()
            .map(|(&addr, layout)| (DevicePtr::from_raw(addr as *mut u8), layout.size()))
            .collect()
    }

    /// Whether `ptr` is the start of a live block.
    pub fn owns(&self, ptr: DevicePtr<u8>) -> bool {
        self.heap().blocks.contains_key(&ptr.addr())
    }

    /// Allocate a zero-initialised block of `bytes` bytes.
    ///
    /// A zero-byte request returns the null address and reserves nothing.
    pub fn allocate(&self, bytes: usize) -> Result<DevicePtr<u8>, DeviceError> {
        if bytes == 0 {
            return Ok(DevicePtr::null());
        }
        let mut heap = self.heap();
        let available = self.config.capacity_bytes - heap.used;
        let oom = DeviceError::OutOfMemory {
            requested: bytes,
            available,
        };
        if bytes > available {
            return Err(oom);
        }
        let layout = Layout::from_size_align(bytes, DEVICE_ALIGN).map_err(|_| oom.clone())?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        if raw.is_null() {
            return Err(oom);
        }
        heap.blocks.insert(raw as usize, layout);
        heap.used += bytes;
        trace!("device alloc {bytes} bytes at {:#x}", raw as usize);
        Ok(DevicePtr::from_raw(raw))
    }

    /// Release a block obtained from [`allocate`](Self::allocate).
    ///
    /// Null is a no-op. An address that is not the start of a live block
    /// (foreign, interior, or already freed) is rejected.
    pub fn free(&self, ptr: DevicePtr<u8>) -> Result<(), DeviceError> {
        if ptr.is_null() {
            return Ok(());
        }
        let mut heap = self.heap();
        let layout = heap
            .blocks
            .shift_remove(&ptr.addr())
            .ok_or(DeviceError::InvalidDevicePointer { addr: ptr.addr() })?;
        let bytes = layout.size();
        heap.used -= bytes;
        // SAFETY: the registry holds the exact layout each block was
        // allocated with, and removal guarantees a single release.
        unsafe { alloc::dealloc(ptr.as_raw_mut(), layout) };
        trace!("device free {bytes} bytes at {:#x}", ptr.addr());
        Ok(())
    }

    /// Copy `bytes` bytes and block until the copy completes.
    ///
    /// Device-side addresses are validated against the live-block
    /// registry; the copy runs under the heap lock so no block can be
    /// released while it is being read or written. All copies on a device,
    /// and its allocations and frees, are therefore serialized: streams
    /// order work, they do not overlap it.
    ///
    /// # Safety
    ///
    /// Host-side pointers (the source of [`CopyKind::HostToDevice`], the
    /// destination of [`CopyKind::DeviceToHost`]) must be valid for
    /// `bytes` bytes of reads or writes respectively, and must not be
    /// accessed concurrently by other code during the copy.
    pub unsafe fn copy(
        &self,
        dst: *mut u8,
        src: *const u8,
        bytes: usize,
        kind: CopyKind,
    ) -> Result<(), DeviceError> {
        if bytes == 0 {
            return Ok(());
        }
        let heap = self.heap();
        if kind.src_space() == MemorySpace::Device {
            heap.check_range(src as usize, bytes)?;
        }
        if kind.dst_space() == MemorySpace::Device {
            heap.check_range(dst as usize, bytes)?;
        }
        // SAFETY: device ranges were validated above and stay live while
        // the heap lock is held; host ranges are valid per the caller's
        // contract. `copy` tolerates overlap for device-to-device moves.
        unsafe { std::ptr::copy(src, dst, bytes) };
        drop(heap);
        trace!("copy {kind} {bytes} bytes");
        Ok(())
    }

    /// Create a new ordered copy stream on this device.
    pub fn create_stream(self: &Arc<Self>) -> Result<Stream, DeviceError> {
        Stream::spawn(Arc::clone(self))
    }

    fn heap(&self) -> MutexGuard<'_, DeviceHeap> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let heap = self.heap.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !heap.blocks.is_empty() {
            warn!(
                "device dropped with {} live blocks ({} bytes); releasing",
                heap.blocks.len(),
                heap.used
            );
        }
        for (addr, layout) in heap.blocks.drain(..) {
            // SAFETY: each registry entry is a live block allocated with
            // its stored layout; draining releases each exactly once.
            unsafe { alloc::dealloc(addr as *mut u8, layout) };
        }
        heap.used = 0;
    }
}

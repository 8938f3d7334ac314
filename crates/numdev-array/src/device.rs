//! Device-resident typed arrays.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use numdev_alloc::{DeviceAllocator, DeviceHeap, HostAllocator, BLOCK_ALIGN};
use numdev_core::{Element, Shape};
use numdev_device::{Device, DevicePtr};

use crate::base::BaseArray;
use crate::error::{ArrayError, TransferError};
use crate::host::HostArray;
use crate::transfer;

/// A typed array in device memory.
///
/// There is no element access from host code: no indexing, no slices, no
/// iterators. Hand [`as_device_ptr`](Self::as_device_ptr) to device code,
/// and move data in and out with the functions in [`transfer`].
pub struct DeviceArray<T: Element, A: DeviceAllocator = DeviceHeap> {
    base: BaseArray<A>,
    _element: PhantomData<T>,
}

impl<T: Element, A: DeviceAllocator> DeviceArray<T, A> {
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

    /// Upload a host array, blocking until the copy completes.
    pub fn from_host<H: HostAllocator>(src: &HostArray<T, H>) -> Result<Self, TransferError> {
        let mut dst = Self::new();
        transfer::host_to_device(&mut dst, src)?;
        Ok(dst)
    }

    /// Download into a fresh `Vec`, blocking until the copy completes.
    pub fn to_host_vec(&self) -> Result<Vec<T>, TransferError> {
        let mut host = HostArray::<T>::new();
        transfer::device_to_host(&mut host, self)?;
        Ok(host.to_vec())
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

    /// The device that owns the block.
    pub fn device(&self) -> &'static Arc<Device> {
        A::device()
    }

    /// The untyped array underneath.
    pub fn base(&self) -> &BaseArray<A> {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut BaseArray<A> {
        &mut self.base
    }

    /// Device address of the first element for read-only kernels; null
    /// when empty.
    pub fn as_device_ptr(&self) -> DevicePtr<T> {
        DevicePtr::from_raw(self.base.raw_ptr().cast_mut().cast())
    }

    /// Device address of the first element for kernels that write.
    pub fn as_device_ptr_mut(&mut self) -> DevicePtr<T> {
        DevicePtr::from_raw(self.base.raw_ptr_mut().cast())
    }
}

impl<T: Element, A: DeviceAllocator> Default for DeviceArray<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, A: DeviceAllocator> From<&DeviceArray<T, A>> for DevicePtr<T> {
    fn from(a: &DeviceArray<T, A>) -> Self {
        a.as_device_ptr()
    }
}

impl<T: Element, A: DeviceAllocator> fmt::Debug for DeviceArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceArray")
            .field("shape", self.shape())
            .field("ptr", &self.as_device_ptr())
            .finish()
    }
}

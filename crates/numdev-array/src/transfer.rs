//! Copies between host and device arrays.
//!
//! Every transfer first makes the destination match the source: if the
//! element counts differ the destination is reallocated through its own
//! strategy (releasing its old block first), and if only the dimensions
//! differ it adopts the source's dimensions and keeps its block. A
//! destination that already has the source's shape is reused untouched,
//! so repeated transfers of same-shaped data never allocate.
//!
//! The synchronous functions return once the bytes have landed. The
//! `_async` functions only queue the copy on a [`Stream`]; they are
//! `unsafe` because the arrays must outlive the queued copy.

#![allow(unsafe_code)]

use std::sync::Arc;

use log::debug;
use numdev_alloc::{Allocator, DeviceAllocator, HostAllocator};
use numdev_core::{CopyKind, Element, Shape};
use numdev_device::{Device, Stream};

use crate::base::BaseArray;
use crate::device::DeviceArray;
use crate::error::TransferError;
use crate::host::HostArray;

/// Reshape or reallocate `dst` to `shape`.
fn conform<A: Allocator>(dst: &mut BaseArray<A>, shape: &Shape) -> Result<(), TransferError> {
    let reallocated = dst.conform_to(shape).map_err(TransferError::Reallocation)?;
    if reallocated {
        debug!("transfer destination reallocated to {shape}");
    }
    Ok(())
}

fn check_stream(stream: &Stream, device: &Arc<Device>) -> Result<(), TransferError> {
    if Arc::ptr_eq(stream.device(), device) {
        Ok(())
    } else {
        Err(TransferError::StreamDeviceMismatch {
            stream: stream.id(),
        })
    }
}

/// Copy a host array into a device array, blocking until done.
///
/// `dst` is reallocated when its element count differs from `src`'s. On
/// reallocation failure `dst` is left empty and
/// [`TransferError::Reallocation`] is returned.
pub fn host_to_device<T, H, D>(
    dst: &mut DeviceArray<T, D>,
    src: &HostArray<T, H>,
) -> Result<(), TransferError>
where
    T: Element,
    H: HostAllocator,
    D: DeviceAllocator,
{
    conform(dst.base_mut(), src.shape())?;
    let bytes = src.byte_size();
    // SAFETY: the host source is borrowed for the whole call and holds
    // `bytes` bytes; the device side is validated by the runtime.
    unsafe {
        D::device().copy(
            dst.as_device_ptr_mut().as_raw_mut().cast(),
            src.as_ptr().cast(),
            bytes,
            CopyKind::HostToDevice,
        )?;
    }
    Ok(())
}

/// Copy a device array into a host array, blocking until done.
///
/// `dst` is reallocated when its element count differs from `src`'s. On
/// reallocation failure `dst` is left empty and
/// [`TransferError::Reallocation`] is returned.
pub fn device_to_host<T, H, D>(
    dst: &mut HostArray<T, H>,
    src: &DeviceArray<T, D>,
) -> Result<(), TransferError>
where
    T: Element,
    H: HostAllocator,
    D: DeviceAllocator,
{
    conform(dst.base_mut(), src.shape())?;
    let bytes = src.byte_size();
    // SAFETY: the host destination is mutably borrowed for the whole call
    // and holds `bytes` bytes after conforming.
    unsafe {
        D::device().copy(
            dst.as_mut_ptr().cast(),
            src.as_device_ptr().as_raw().cast(),
            bytes,
            CopyKind::DeviceToHost,
        )?;
    }
    Ok(())
}

/// Copy one device array into another on the same device, blocking
/// until done.
pub fn device_to_device<T, D1, D2>(
    dst: &mut DeviceArray<T, D1>,
    src: &DeviceArray<T, D2>,
) -> Result<(), TransferError>
where
    T: Element,
    D1: DeviceAllocator,
    D2: DeviceAllocator,
{
    if !Arc::ptr_eq(D1::device(), D2::device()) {
        return Err(TransferError::DeviceMismatch);
    }
    conform(dst.base_mut(), src.shape())?;
    // SAFETY: both sides are device ranges validated by the runtime.
    unsafe {
        D1::device().copy(
            dst.as_device_ptr_mut().as_raw_mut().cast(),
            src.as_device_ptr().as_raw().cast(),
            src.byte_size(),
            CopyKind::DeviceToDevice,
        )?;
    }
    Ok(())
}

/// Queue a host-to-device copy on `stream` and return immediately.
///
/// Reallocation of `dst`, if needed, happens synchronously before the
/// copy is queued. Copy failures surface from the next
/// [`Stream::synchronize`].
///
/// # Safety
///
/// Until `stream.synchronize()` returns (or the stream is dropped):
/// `src` must stay alive and unmodified, and `dst` must not be read,
/// dropped, or used as the destination of another reallocating transfer.
pub unsafe fn host_to_device_async<T, H, D>(
    dst: &mut DeviceArray<T, D>,
    src: &HostArray<T, H>,
    stream: &Stream,
) -> Result<(), TransferError>
where
    T: Element,
    H: HostAllocator,
    D: DeviceAllocator,
{
    check_stream(stream, D::device())?;
    conform(dst.base_mut(), src.shape())?;
    // SAFETY: lifetimes of both ranges are the caller's contract.
    unsafe {
        stream.enqueue_copy(
            dst.as_device_ptr_mut().as_raw_mut().cast(),
            src.as_ptr().cast(),
            src.byte_size(),
            CopyKind::HostToDevice,
        )?;
    }
    Ok(())
}

/// Queue a device-to-host copy on `stream` and return immediately.
///
/// # Safety
///
/// Until `stream.synchronize()` returns (or the stream is dropped):
/// `dst` must stay alive and must not be read, written, or reallocated,
/// and `src` must stay alive and unmodified.
pub unsafe fn device_to_host_async<T, H, D>(
    dst: &mut HostArray<T, H>,
    src: &DeviceArray<T, D>,
    stream: &Stream,
) -> Result<(), TransferError>
where
    T: Element,
    H: HostAllocator,
    D: DeviceAllocator,
{
    check_stream(stream, D::device())?;
    conform(dst.base_mut(), src.shape())?;
    // SAFETY: lifetimes of both ranges are the caller's contract.
    unsafe {
        stream.enqueue_copy(
            dst.as_mut_ptr().cast(),
            src.as_device_ptr().as_raw().cast(),
            src.byte_size(),
            CopyKind::DeviceToHost,
        )?;
    }
    Ok(())
}

/// Queue a device-to-device copy on `stream` and return immediately.
///
/// # Safety
///
/// Both arrays must stay alive, and `dst` must not be reallocated, until
/// `stream.synchronize()` returns or the stream is dropped.
pub unsafe fn device_to_device_async<T, D1, D2>(
    dst: &mut DeviceArray<T, D1>,
    src: &DeviceArray<T, D2>,
    stream: &Stream,
) -> Result<(), TransferError>
where
    T: Element,
    D1: DeviceAllocator,
    D2: DeviceAllocator,
{
    if !Arc::ptr_eq(D1::device(), D2::device()) {
        return Err(TransferError::DeviceMismatch);
    }
    check_stream(stream, D1::device())?;
    conform(dst.base_mut(), src.shape())?;
    // SAFETY: lifetimes of both ranges are the caller's contract.
    unsafe {
        stream.enqueue_copy(
            dst.as_device_ptr_mut().as_raw_mut().cast(),
            src.as_device_ptr().as_raw().cast(),
            src.byte_size(),
            CopyKind::DeviceToDevice,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArrayError;
    use numdev_alloc::DeviceHeap;
    use numdev_core::MemorySpace;
    use numdev_device::DeviceConfig;
    use numdev_test_utils::{
        device_counts, host_counts, reset_device_counts, reset_host_counts, CountingDeviceHeap,
        CountingHostHeap, NullDeviceHeap, NullHostHeap,
    };

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn host_device_host_scenario() {
        init_logging();
        let h = HostArray::<i32>::from_slice(&[3], &[1, 2, 3]).unwrap();
        let mut d = DeviceArray::<i32>::new();
        host_to_device(&mut d, &h).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(d.size(), &[3]);

        let mut h2 = HostArray::<i32>::new();
        device_to_host(&mut h2, &d).unwrap();
        assert_eq!(h2.as_slice(), &[1, 2, 3]);
        assert_eq!(h2, h);
    }

    #[test]
    fn same_shape_destination_is_reused() {
        let h = HostArray::<f32>::from_elem(&[4, 4], 2.0).unwrap();
        let mut d = DeviceArray::<f32>::new2(4, 4);
        let ptr = d.as_device_ptr();
        for _ in 0..3 {
            host_to_device(&mut d, &h).unwrap();
            assert_eq!(d.as_device_ptr(), ptr);
        }

        let mut back = HostArray::<f32>::new2(4, 4);
        let host_ptr = back.as_ptr();
        for _ in 0..3 {
            device_to_host(&mut back, &d).unwrap();
            assert_eq!(back.as_ptr(), host_ptr);
        }
        assert_eq!(back, h);
    }

    #[test]
    fn mismatched_destination_is_reallocated_once() {
        reset_host_counts();
        let src = DeviceArray::<u16>::from_host(
            &HostArray::<u16>::from_slice(&[4], &[1, 2, 3, 4]).unwrap(),
        )
        .unwrap();
        let mut dst = HostArray::<u16, CountingHostHeap>::new3(3, 3, 1);
        assert_eq!(dst.len(), 9);
        device_to_host(&mut dst, &src).unwrap();
        assert_eq!(dst.size(), &[4]);
        assert_eq!(dst.as_slice(), &[1, 2, 3, 4]);
        let counts = host_counts();
        assert_eq!(counts.allocs, 2);
        assert_eq!(counts.frees, 1);
    }

    #[test]
    fn mismatched_device_destination_is_reallocated_once() {
        reset_device_counts();
        let h = HostArray::<u8>::from_slice(&[2, 2], &[9, 8, 7, 6]).unwrap();
        let mut d = DeviceArray::<u8, CountingDeviceHeap>::new2(3, 3);
        host_to_device(&mut d, &h).unwrap();
        assert_eq!(d.size(), &[2, 2]);
        let counts = device_counts();
        assert_eq!(counts.allocs, 2);
        assert_eq!(counts.frees, 1);
        drop(d);
        assert_eq!(device_counts().frees, 2);
    }

    #[test]
    fn equal_count_different_dims_reshapes_without_realloc() {
        let h = HostArray::<i64>::from_slice(&[2, 3], &[1, 2, 3, 4, 5, 6]).unwrap();
        let mut d = DeviceArray::<i64>::new2(3, 2);
        let ptr = d.as_device_ptr();
        host_to_device(&mut d, &h).unwrap();
        assert_eq!(d.as_device_ptr(), ptr);
        assert_eq!(d.size(), &[2, 3]);
    }

    #[test]
    fn reallocation_failure_empties_destination() {
        init_logging();
        let d = DeviceArray::<f32>::from_host(
            &HostArray::<f32>::from_elem(&[8], 1.0).unwrap(),
        )
        .unwrap();
        let mut h = HostArray::<f32, NullHostHeap>::new();
        let err = device_to_host(&mut h, &d).unwrap_err();
        assert!(matches!(err, TransferError::Reallocation(_)));
        assert!(h.is_empty());

        let src = HostArray::<f32>::from_elem(&[8], 1.0).unwrap();
        let mut dd = DeviceArray::<f32, NullDeviceHeap>::new();
        let err = host_to_device(&mut dd, &src).unwrap_err();
        assert!(matches!(err, TransferError::Reallocation(_)));
        assert!(dd.is_empty());
    }

    #[test]
    fn async_reallocation_failure_enqueues_nothing() {
        init_logging();
        let stream = Stream::new().unwrap();
        let d = DeviceArray::<u16>::from_host(
            &HostArray::<u16>::from_slice(&[2, 3], &[1, 2, 3, 4, 5, 6]).unwrap(),
        )
        .unwrap();
        let mut h = HostArray::<u16, NullHostHeap>::new();
        let err = unsafe { device_to_host_async(&mut h, &d, &stream) }.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Reallocation(ArrayError::AllocationFailed {
                space: MemorySpace::Host,
                bytes: 12,
            })
        ));
        assert!(h.is_empty());
        assert!(h.size().is_empty());
        // No copy reached the worker, so there is no deferred error either.
        stream.synchronize().unwrap();

        let src = HostArray::<u16>::from_elem(&[4], 9).unwrap();
        let mut dd = DeviceArray::<u16, NullDeviceHeap>::new1(0);
        let err = unsafe { host_to_device_async(&mut dd, &src, &stream) }.unwrap_err();
        assert!(matches!(err, TransferError::Reallocation(_)));
        assert!(dd.is_empty());
        stream.synchronize().unwrap();
    }

    #[test]
    fn empty_source_empties_destination() {
        let empty = HostArray::<u32>::new();
        let mut d = DeviceArray::<u32>::new1(5);
        host_to_device(&mut d, &empty).unwrap();
        assert!(d.is_empty());
        assert!(d.size().is_empty());
    }

    #[test]
    fn zero_length_source_copies_nothing() {
        let src = HostArray::<u32>::new2(0, 3);
        let mut d = DeviceArray::<u32>::new();
        host_to_device(&mut d, &src).unwrap();
        assert!(d.is_empty());
        assert_eq!(d.size(), &[0, 3]);
    }

    #[test]
    fn device_to_device_duplicates() {
        let h = HostArray::<f64>::from_slice(&[3], &[0.5, 1.5, 2.5]).unwrap();
        let a = DeviceArray::<f64>::from_host(&h).unwrap();
        let mut b = DeviceArray::<f64>::new();
        device_to_device(&mut b, &a).unwrap();
        assert_ne!(a.as_device_ptr(), b.as_device_ptr());
        assert_eq!(b.to_host_vec().unwrap(), vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn async_round_trip() {
        init_logging();
        let stream = Stream::new().unwrap();
        let h = HostArray::<i32>::from_slice(&[2, 3], &[1, 2, 3, 4, 5, 6]).unwrap();
        let mut d = DeviceArray::<i32>::new();
        let mut d2 = DeviceArray::<i32>::new();
        let mut out = HostArray::<i32>::new();
        unsafe {
            host_to_device_async(&mut d, &h, &stream).unwrap();
            device_to_device_async(&mut d2, &d, &stream).unwrap();
            device_to_host_async(&mut out, &d2, &stream).unwrap();
        }
        // Shapes are settled before the copies run.
        assert_eq!(d.size(), &[2, 3]);
        assert_eq!(out.size(), &[2, 3]);
        stream.synchronize().unwrap();
        assert_eq!(out, h);
    }

    #[test]
    fn stream_from_other_device_is_rejected() {
        let other = Device::new(DeviceConfig::with_capacity(1024)).unwrap();
        let stream = other.create_stream().unwrap();
        let h = HostArray::<u8>::from_slice(&[1], &[1]).unwrap();
        let mut d = DeviceArray::<u8, DeviceHeap>::new();
        let err = unsafe { host_to_device_async(&mut d, &h, &stream) }.unwrap_err();
        assert_eq!(
            err,
            TransferError::StreamDeviceMismatch {
                stream: stream.id()
            }
        );
        assert!(d.is_empty());
    }
}

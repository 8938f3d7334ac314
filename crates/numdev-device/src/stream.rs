//! Ordered asynchronous copy queues.
//!
//! A [`Stream`] owns one worker thread fed by a bounded crossbeam channel.
//! Operations execute in the order they were enqueued; nothing is ordered
//! across different streams. Errors raised by the worker are sticky: the
//! first one is kept and handed back by the next
//! [`synchronize`](Stream::synchronize).

#![allow(unsafe_code)]

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, trace, warn};
use numdev_core::CopyKind;

use crate::device::Device;
use crate::error::DeviceError;

static STREAM_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Stream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw copy request in flight to the worker thread.
struct RawCopy {
    dst: *mut u8,
    src: *const u8,
    bytes: usize,
    kind: CopyKind,
}

// SAFETY: the enqueueing caller guarantees both ranges stay valid and
// unaliased until the stream is synchronized (see `enqueue_copy`).
unsafe impl Send for RawCopy {}

enum StreamOp {
    Copy(RawCopy),
    /// Acknowledged once every earlier operation has run.
    Fence(Sender<()>),
}

/// First error observed by the worker since the last synchronize.
#[derive(Default)]
struct StickyError(Mutex<Option<DeviceError>>);

impl StickyError {
    fn record(&self, err: DeviceError) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<DeviceError> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// An in-order queue of device copies executed by a dedicated worker.
///
/// Enqueueing returns as soon as the operation is queued; if the queue is
/// at [`stream_queue_depth`](crate::DeviceConfig::stream_queue_depth) the
/// caller blocks until the worker catches up. Dropping a stream drains
/// every queued operation before returning.
pub struct Stream {
    id: StreamId,
    device: Arc<Device>,
    tx: Option<Sender<StreamOp>>,
    worker: Option<JoinHandle<()>>,
    error: Arc<StickyError>,
}

impl Stream {
    /// Create a stream on the primary device.
    pub fn new() -> Result<Self, DeviceError> {
        Device::primary().create_stream()
    }

    pub(crate) fn spawn(device: Arc<Device>) -> Result<Self, DeviceError> {
        let id = StreamId(STREAM_COUNTER.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = crossbeam_channel::bounded(device.config().stream_queue_depth);
        let error = Arc::new(StickyError::default());
        let worker = {
            let device = Arc::clone(&device);
            let error = Arc::clone(&error);
            std::thread::Builder::new()
                .name(format!("numdev-stream-{id}"))
                .spawn(move || run_worker(&device, &rx, &error))
                .map_err(|e| DeviceError::StreamSpawnFailed {
                    reason: e.to_string(),
                })?
        };
        debug!("stream {id} started");
        Ok(Self {
            id,
            device,
            tx: Some(tx),
            worker: Some(worker),
            error,
        })
    }

    /// This stream's identifier.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The device this stream copies on.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Queue a copy and return without waiting for it.
    ///
    /// Validation of device addresses happens when the worker runs the
    /// copy; failures surface from the next
    /// [`synchronize`](Self::synchronize).
    ///
    /// # Safety
    ///
    /// Both ranges must remain valid for `bytes` bytes until a later
    /// `synchronize` on this stream returns (or the stream is dropped), and
    /// host code must not read or write them in the meantime.
    pub unsafe fn enqueue_copy(
        &self,
        dst: *mut u8,
        src: *const u8,
        bytes: usize,
        kind: CopyKind,
    ) -> Result<(), DeviceError> {
        trace!("stream {} enqueue {kind} {bytes} bytes", self.id);
        self.send(StreamOp::Copy(RawCopy {
            dst,
            src,
            bytes,
            kind,
        }))
    }

    /// Block until every operation enqueued so far has executed.
    ///
    /// Returns the first error the worker hit since the previous call and
    /// clears it.
    pub fn synchronize(&self) -> Result<(), DeviceError> {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.send(StreamOp::Fence(ack_tx))?;
        ack_rx
            .recv()
            .map_err(|_| DeviceError::StreamWorkerPanicked)?;
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn send(&self, op: StreamOp) -> Result<(), DeviceError> {
        let tx = self.tx.as_ref().ok_or(DeviceError::StreamClosed)?;
        tx.send(op).map_err(|_| DeviceError::StreamWorkerPanicked)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").field("id", &self.id).finish()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("stream {} worker panicked", self.id);
            }
        }
        if let Some(err) = self.error.take() {
            warn!("stream {} dropped with unreported error: {err}", self.id);
        }
        debug!("stream {} stopped", self.id);
    }
}

fn run_worker(device: &Device, rx: &Receiver<StreamOp>, error: &StickyError) {
    for op in rx.iter() {
        match op {
            StreamOp::Copy(c) => {
                // SAFETY: validity of both ranges until synchronization is
                // the enqueueing caller's contract.
                let result = unsafe { device.copy(c.dst, c.src, c.bytes, c.kind) };
                if let Err(e) = result {
                    error.record(e);
                }
            }
            StreamOp::Fence(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;

    fn device() -> Arc<Device> {
        let _ = env_logger::builder().is_test(true).try_init();
        Device::new(DeviceConfig::with_capacity(1 << 20)).unwrap()
    }

    #[test]
    fn stream_ids_are_unique() {
        let dev = device();
        let a = dev.create_stream().unwrap();
        let b = dev.create_stream().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn async_round_trip_after_synchronize() {
        let dev = device();
        let stream = dev.create_stream().unwrap();
        let d = dev.allocate(16).unwrap();
        let src: Vec<u8> = (0..16).collect();
        let mut out = vec![0u8; 16];
        unsafe {
            stream
                .enqueue_copy(d.as_raw_mut(), src.as_ptr(), 16, CopyKind::HostToDevice)
                .unwrap();
            stream
                .enqueue_copy(out.as_mut_ptr(), d.as_raw(), 16, CopyKind::DeviceToHost)
                .unwrap();
        }
        stream.synchronize().unwrap();
        assert_eq!(out, src);
        dev.free(d).unwrap();
    }

    #[test]
    fn operations_run_in_enqueue_order() {
        let dev = device();
        let stream = dev.create_stream().unwrap();
        let d = dev.allocate(1).unwrap();
        let values: Vec<u8> = (1..=50).collect();
        let mut snapshots = vec![0u8; values.len()];
        for (v, out) in values.iter().zip(snapshots.iter_mut()) {
            unsafe {
                stream
                    .enqueue_copy(d.as_raw_mut(), v, 1, CopyKind::HostToDevice)
                    .unwrap();
                stream
                    .enqueue_copy(out, d.as_raw(), 1, CopyKind::DeviceToHost)
                    .unwrap();
            }
        }
        stream.synchronize().unwrap();
        assert_eq!(snapshots, values);
    }

    #[test]
    fn worker_errors_are_sticky_until_synchronize() {
        let dev = device();
        let stream = dev.create_stream().unwrap();
        let src = [0u8; 4];
        let mut bogus = [0u8; 4];
        unsafe {
            stream
                .enqueue_copy(bogus.as_mut_ptr(), src.as_ptr(), 4, CopyKind::HostToDevice)
                .unwrap();
        }
        assert!(matches!(
            stream.synchronize(),
            Err(DeviceError::InvalidDevicePointer { .. })
        ));
        // Reported once, then cleared.
        assert!(stream.synchronize().is_ok());
    }

    #[test]
    fn oversized_device_copy_fails_on_worker() {
        let dev = device();
        let stream = dev.create_stream().unwrap();
        let a = dev.allocate(32).unwrap();
        let b = dev.allocate(32).unwrap();
        unsafe {
            stream
                .enqueue_copy(
                    b.as_raw_mut().add(8),
                    a.as_raw().add(8),
                    usize::MAX,
                    CopyKind::DeviceToDevice,
                )
                .unwrap();
        }
        assert!(matches!(
            stream.synchronize(),
            Err(DeviceError::CopyOutOfBounds { block: 32, .. })
        ));
        dev.free(a).unwrap();
        dev.free(b).unwrap();
    }

    #[test]
    fn drop_drains_pending_copies() {
        let dev = device();
        let d = dev.allocate(8).unwrap();
        let src = [3u8; 8];
        let mut out = [0u8; 8];
        {
            let stream = dev.create_stream().unwrap();
            unsafe {
                stream
                    .enqueue_copy(d.as_raw_mut(), src.as_ptr(), 8, CopyKind::HostToDevice)
                    .unwrap();
                stream
                    .enqueue_copy(out.as_mut_ptr(), d.as_raw(), 8, CopyKind::DeviceToHost)
                    .unwrap();
            }
        }
        assert_eq!(out, src);
    }

    #[test]
    fn small_queue_depth_applies_backpressure() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dev = Device::new(DeviceConfig {
            capacity_bytes: 1024,
            stream_queue_depth: 1,
        })
        .unwrap();
        let stream = dev.create_stream().unwrap();
        let d = dev.allocate(4).unwrap();
        let src = [9u8; 4];
        for _ in 0..32 {
            unsafe {
                stream
                    .enqueue_copy(d.as_raw_mut(), src.as_ptr(), 4, CopyKind::HostToDevice)
                    .unwrap();
            }
        }
        stream.synchronize().unwrap();
    }
}

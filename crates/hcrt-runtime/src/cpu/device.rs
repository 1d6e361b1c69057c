//! The CPU fallback device.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use hcrt_core::{
    Device, DeviceBuffer, DeviceId, ExecuteOrder, HcrtError, KernelHandle, Queue, Result,
};

use super::alloc::{aligned_alloc, aligned_free};
use super::queue::CpuFallbackQueue;
use super::FALLBACK_PATH;

/// Host-backed device that guarantees the runtime always has somewhere to
/// put data.
///
/// Reports double precision, unified memory and emulation; memory size is
/// zero (unbounded, host-backed) and the version is 0.
#[derive(Debug)]
pub struct CpuFallbackDevice {
    id: DeviceId,
    alignment: usize,
    live_buffers: AtomicUsize,
}

impl CpuFallbackDevice {
    /// Fallback device allocating with `alignment` (a power of two).
    pub fn new(alignment: usize) -> Result<Self> {
        if !alignment.is_power_of_two() {
            return Err(HcrtError::Initialization(format!(
                "fallback alignment {} is not a power of two",
                alignment
            )));
        }
        Ok(Self {
            id: DeviceId::next(),
            alignment,
            live_buffers: AtomicUsize::new(0),
        })
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Buffers created and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::Relaxed)
    }

    fn foreign(&self) -> HcrtError {
        HcrtError::ForeignBuffer {
            device: FALLBACK_PATH.to_string(),
        }
    }
}

impl Device for CpuFallbackDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn path(&self) -> &str {
        FALLBACK_PATH
    }

    fn description(&self) -> &str {
        "CPU Fallback"
    }

    fn memory_size(&self) -> u64 {
        0
    }

    fn supports_double(&self) -> bool {
        true
    }

    fn supports_limited_double(&self) -> bool {
        true
    }

    fn is_unified(&self) -> bool {
        true
    }

    fn is_emulated(&self) -> bool {
        true
    }

    fn version(&self) -> u32 {
        0
    }

    fn create(&self, byte_count: usize) -> Result<DeviceBuffer> {
        let ptr = aligned_alloc(byte_count, self.alignment)?;
        self.live_buffers.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(bytes = byte_count, align = self.alignment, "fallback alloc");
        Ok(unsafe { DeviceBuffer::from_raw_parts(ptr, byte_count, self.id) })
    }

    fn release(&self, buffer: DeviceBuffer) -> Result<()> {
        if buffer.device() != self.id {
            return Err(self.foreign());
        }
        let (ptr, len, _) = buffer.into_raw_parts();
        // Same size and alignment the block was allocated with.
        unsafe { aligned_free(ptr, len, self.alignment) };
        self.live_buffers.fetch_sub(1, Ordering::Relaxed);
        tracing::trace!(bytes = len, "fallback free");
        Ok(())
    }

    fn create_queue(self: Arc<Self>, order: ExecuteOrder) -> Arc<dyn Queue> {
        let device: Weak<dyn Device> = Arc::downgrade(&self) as Weak<dyn Device>;
        Arc::new(CpuFallbackQueue::new(device, self.id, order))
    }

    fn create_kernel(&self, symbol: &str, _queue: &dyn Queue) -> Result<KernelHandle> {
        // Nothing to load: the handle only records the name.
        Ok(KernelHandle::new(symbol, self.id, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties() {
        let dev = CpuFallbackDevice::new(4096).unwrap();
        let props = dev.properties();
        assert_eq!(props.path, "fallback");
        assert_eq!(props.description, "CPU Fallback");
        assert_eq!(props.memory_bytes, 0);
        assert!(props.supports_double);
        assert!(props.supports_limited_double);
        assert!(props.unified_memory);
        assert!(props.emulated);
        assert_eq!(props.version, 0);
    }

    #[test]
    fn test_rejects_bad_alignment() {
        assert!(matches!(
            CpuFallbackDevice::new(100),
            Err(HcrtError::Initialization(_))
        ));
    }

    #[test]
    fn test_create_is_aligned() {
        let dev = CpuFallbackDevice::new(4096).unwrap();
        let buf = dev.create(100).unwrap();
        assert_eq!(buf.as_ptr() as usize % 4096, 0);
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.device(), dev.id());
        assert_eq!(dev.live_buffers(), 1);
        dev.release(buf).unwrap();
        assert_eq!(dev.live_buffers(), 0);
    }

    #[test]
    fn test_release_foreign_buffer() {
        let a = CpuFallbackDevice::new(64).unwrap();
        let b = CpuFallbackDevice::new(64).unwrap();
        let buf = a.create(16).unwrap();
        assert!(matches!(b.release(buf), Err(HcrtError::ForeignBuffer { .. })));
    }

    #[test]
    fn test_create_queue_keeps_order_and_device() {
        let dev = Arc::new(CpuFallbackDevice::new(4096).unwrap());
        let queue = Arc::clone(&dev).create_queue(ExecuteOrder::OutOfOrder);
        assert_eq!(queue.order(), ExecuteOrder::OutOfOrder);
        assert_eq!(queue.device().unwrap().id(), dev.id());
    }

    #[test]
    fn test_queue_does_not_keep_device_alive() {
        let dev = Arc::new(CpuFallbackDevice::new(4096).unwrap());
        let queue = Arc::clone(&dev).create_queue(ExecuteOrder::InOrder);
        drop(dev);
        assert_eq!(queue.device().unwrap_err(), HcrtError::DeviceReleased);
    }

    #[test]
    fn test_create_kernel_is_inert() {
        let dev = Arc::new(CpuFallbackDevice::new(4096).unwrap());
        let queue = Arc::clone(&dev).create_queue(ExecuteOrder::InOrder);
        let handle = dev.create_kernel("saxpy", &*queue).unwrap();
        assert_eq!(handle.symbol(), "saxpy");
        assert_eq!(handle.raw(), 0);
    }
}

//! The CPU fallback queue.
//!
//! Concurrent data movement on disjoint regions is safe. Overlapping
//! concurrent writes to the same buffer are a data race and must be
//! serialized by the caller.

use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use hcrt_core::{
    AsyncOp, Device, DeviceBuffer, DeviceId, ExecuteOrder, HcrtError, KernelHandle, Queue, Result,
};

use super::FALLBACK_PATH;

/// Queue bound to a [`super::CpuFallbackDevice`].
///
/// Every operation completes before it returns, so both execution orders
/// behave as in-order.
#[derive(Debug)]
pub struct CpuFallbackQueue {
    device: Weak<dyn Device>,
    device_id: DeviceId,
    order: ExecuteOrder,
    bytes_moved: AtomicU64,
}

impl CpuFallbackQueue {
    pub fn new(device: Weak<dyn Device>, device_id: DeviceId, order: ExecuteOrder) -> Self {
        Self {
            device,
            device_id,
            order,
            bytes_moved: AtomicU64::new(0),
        }
    }

    /// Total bytes this queue has actually moved. Elided self-copies add nothing.
    pub fn bytes_moved(&self) -> u64 {
        self.bytes_moved.load(Ordering::Relaxed)
    }

    fn check_owner(&self, buffer: &DeviceBuffer) -> Result<()> {
        if buffer.device() == self.device_id {
            Ok(())
        } else {
            Err(HcrtError::ForeignBuffer {
                device: FALLBACK_PATH.to_string(),
            })
        }
    }

    /// Overlap-safe move of `count` bytes, skipped when `src == dst`.
    ///
    /// # Safety
    /// Both ranges must be valid for `count` bytes.
    unsafe fn move_bytes(&self, src: *const u8, dst: *mut u8, count: usize) {
        if ptr::eq(src, dst) || count == 0 {
            return;
        }
        ptr::copy(src, dst, count);
        self.bytes_moved.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn reject_launch(&self, operation: &'static str, global: &[usize], local: &[usize]) -> HcrtError {
        debug_assert_eq!(global.len(), local.len(), "global and local rank differ");
        tracing::debug!(operation, "kernel launch rejected by CPU fallback");
        HcrtError::unsupported(FALLBACK_PATH, operation)
    }
}

impl Queue for CpuFallbackQueue {
    fn device(&self) -> Result<Arc<dyn Device>> {
        self.device.upgrade().ok_or(HcrtError::DeviceReleased)
    }

    fn order(&self) -> ExecuteOrder {
        self.order
    }

    fn launch_kernel(&self, _kernel: &KernelHandle, global: &[usize], local: &[usize]) -> Result<()> {
        Err(self.reject_launch("launch_kernel", global, local))
    }

    fn launch_kernel_async(
        &self,
        _kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
    ) -> Result<Arc<dyn AsyncOp>> {
        Err(self.reject_launch("launch_kernel_async", global, local))
    }

    fn launch_kernel_with_dynamic_group_memory(
        &self,
        _kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
        _dynamic_group_bytes: usize,
    ) -> Result<()> {
        Err(self.reject_launch("launch_kernel_with_dynamic_group_memory", global, local))
    }

    fn launch_kernel_with_dynamic_group_memory_async(
        &self,
        _kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
        _dynamic_group_bytes: usize,
    ) -> Result<Arc<dyn AsyncOp>> {
        Err(self.reject_launch("launch_kernel_with_dynamic_group_memory_async", global, local))
    }

    fn read(&self, buffer: &DeviceBuffer, dst: &mut [u8], offset: usize) -> Result<()> {
        self.check_owner(buffer)?;
        let src = buffer.address_at(offset, dst.len())?;
        unsafe { self.move_bytes(src.as_ptr(), dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }

    fn write(&self, buffer: &DeviceBuffer, src: &[u8], offset: usize, _blocking: bool) -> Result<()> {
        self.check_owner(buffer)?;
        let dst = buffer.address_at(offset, src.len())?;
        unsafe { self.move_bytes(src.as_ptr(), dst.as_ptr(), src.len()) };
        Ok(())
    }

    fn copy(
        &self,
        src: &DeviceBuffer,
        dst: &DeviceBuffer,
        count: usize,
        src_offset: usize,
        dst_offset: usize,
        _blocking: bool,
    ) -> Result<()> {
        self.check_owner(src)?;
        self.check_owner(dst)?;
        let from = src.address_at(src_offset, count)?;
        let to = dst.address_at(dst_offset, count)?;
        unsafe { self.move_bytes(from.as_ptr(), to.as_ptr(), count) };
        Ok(())
    }

    fn map(&self, buffer: &DeviceBuffer, count: usize, offset: usize, _modify: bool) -> Result<NonNull<u8>> {
        self.check_owner(buffer)?;
        buffer.address_at(offset, count)
    }

    fn unmap(
        &self,
        _buffer: &DeviceBuffer,
        _addr: NonNull<u8>,
        _count: usize,
        _offset: usize,
        _modify: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn push_argument(
        &self,
        _kernel: &KernelHandle,
        _index: usize,
        _buffer: &DeviceBuffer,
        _is_const: bool,
    ) -> Result<()> {
        Ok(())
    }
}

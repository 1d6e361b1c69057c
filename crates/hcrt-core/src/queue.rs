//! Per-device command queues.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::{AsyncOp, Completion, Device, DeviceBuffer, ExecuteOrder, KernelHandle, Result};

/// An ordered or unordered stream of kernel launches and data movement bound
/// to one device.
///
/// Queues are shared (`Arc<dyn Queue>`) and may be used from several threads.
/// Each backend documents whether concurrent submissions to one queue are safe.
///
/// Launch entry points take the flattened domain: `global` and `local` have
/// the same length, which is the domain's rank. A `local` of all zeros means
/// the domain is untiled.
///
/// Data movement moves exactly the requested bytes with overlap-safe
/// semantics, and is a no-op when source and destination are the same
/// memory region.
pub trait Queue: Send + Sync + fmt::Debug {
    /// The device this queue submits to.
    ///
    /// Fails with [`crate::HcrtError::DeviceReleased`] once the device is gone.
    fn device(&self) -> Result<Arc<dyn Device>>;

    fn order(&self) -> ExecuteOrder;

    /// Dispatch and block until the kernel completes.
    ///
    /// The domain's rank is `global.len()`. `local` always has the same
    /// length and is all zero for an untiled domain.
    fn launch_kernel(&self, kernel: &KernelHandle, global: &[usize], local: &[usize])
        -> Result<()>;

    /// Dispatch and return immediately.
    fn launch_kernel_async(
        &self,
        kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
    ) -> Result<Arc<dyn AsyncOp>>;

    /// As [`Queue::launch_kernel`], reserving `dynamic_group_bytes` of scratch
    /// memory per dispatch.
    fn launch_kernel_with_dynamic_group_memory(
        &self,
        kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
        dynamic_group_bytes: usize,
    ) -> Result<()>;

    fn launch_kernel_with_dynamic_group_memory_async(
        &self,
        kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
        dynamic_group_bytes: usize,
    ) -> Result<Arc<dyn AsyncOp>>;

    /// Copy `dst.len()` bytes starting at `offset` in `buffer` into `dst`.
    fn read(&self, buffer: &DeviceBuffer, dst: &mut [u8], offset: usize) -> Result<()>;

    /// Copy `src` into `buffer` starting at `offset`.
    ///
    /// A non-blocking write may return before the bytes land; it yields no
    /// handle, so ordering comes from the queue.
    fn write(&self, buffer: &DeviceBuffer, src: &[u8], offset: usize, blocking: bool)
        -> Result<()>;

    /// Device-to-device copy of `count` bytes.
    fn copy(
        &self,
        src: &DeviceBuffer,
        dst: &DeviceBuffer,
        count: usize,
        src_offset: usize,
        dst_offset: usize,
        blocking: bool,
    ) -> Result<()>;

    /// Device-to-device copy observed through an [`AsyncOp`].
    ///
    /// Backends without an asynchronous copy engine get a blocking copy and an
    /// already completed operation.
    fn copy_async(
        &self,
        src: &DeviceBuffer,
        dst: &DeviceBuffer,
        count: usize,
        src_offset: usize,
        dst_offset: usize,
    ) -> Result<Arc<dyn AsyncOp>> {
        self.copy(src, dst, count, src_offset, dst_offset, true)?;
        Ok(Arc::new(Completion::finished(Ok(()))))
    }

    /// Make `count` bytes at `offset` host-accessible.
    ///
    /// Unified-memory backends return `buffer + offset` directly. Others stage
    /// the bytes and return the staging address.
    fn map(&self, buffer: &DeviceBuffer, count: usize, offset: usize, modify: bool)
        -> Result<NonNull<u8>>;

    /// End a mapping started by [`Queue::map`]. Staging backends copy the
    /// bytes back when `modify` is set.
    fn unmap(
        &self,
        buffer: &DeviceBuffer,
        addr: NonNull<u8>,
        count: usize,
        offset: usize,
        modify: bool,
    ) -> Result<()>;

    /// Bind `buffer` as argument `index` of a pending dispatch of `kernel`.
    fn push_argument(
        &self,
        kernel: &KernelHandle,
        index: usize,
        buffer: &DeviceBuffer,
        is_const: bool,
    ) -> Result<()>;

    /// Block until every submitted operation has completed.
    fn wait(&self) -> Result<()> {
        Ok(())
    }
}

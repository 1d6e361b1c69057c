//! Opaque handles to device-addressable storage.

use std::fmt;
use std::ptr::NonNull;

use crate::{DeviceId, HcrtError, Result};

/// A block of device-addressable storage returned by [`crate::Device::create`].
///
/// The handle does not free its storage on drop: it must be handed back to
/// the owning device through [`crate::Device::release`], which consumes it.
pub struct DeviceBuffer {
    ptr: NonNull<u8>,
    len: usize,
    device: DeviceId,
}

// The handle is an address plus a length; synchronization of the bytes behind
// it is the responsibility of the queue moving them.
unsafe impl Send for DeviceBuffer {}
unsafe impl Sync for DeviceBuffer {}

impl DeviceBuffer {
    /// Wrap a raw allocation.
    ///
    /// # Safety
    /// `ptr` must stay valid for reads and writes of `len` bytes until the
    /// handle is released by the device identified by `device`.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize, device: DeviceId) -> Self {
        Self { ptr, len, device }
    }

    /// Base address of the storage.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Number of bytes in this buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Device that allocated this buffer.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Check that `count` bytes starting at `offset` lie inside the buffer.
    pub fn check_range(&self, offset: usize, count: usize) -> Result<()> {
        match offset.checked_add(count) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(HcrtError::OutOfBounds {
                offset,
                count,
                size: self.len,
            }),
        }
    }

    /// Address of the byte at `offset`, after a range check for `count` bytes.
    pub fn address_at(&self, offset: usize, count: usize) -> Result<NonNull<u8>> {
        self.check_range(offset, count)?;
        // In range, so the offset pointer stays inside the allocation.
        Ok(unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) })
    }

    /// Decompose the handle, e.g. for a backend's release path.
    pub fn into_raw_parts(self) -> (NonNull<u8>, usize, DeviceId) {
        (self.ptr, self.len, self.device)
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("device", &self.device)
            .finish()
    }
}

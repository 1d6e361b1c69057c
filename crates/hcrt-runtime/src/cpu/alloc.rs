//! Over-aligned host allocation.

use std::alloc::Layout;
use std::ptr::NonNull;

use hcrt_core::{HcrtError, Result};

/// Layout for a `bytes`-byte block. Zero-byte requests still reserve one byte
/// so every handle owns a distinct address.
pub fn layout(bytes: usize, align: usize) -> Result<Layout> {
    Layout::from_size_align(bytes.max(1), align).map_err(|e| HcrtError::Allocation {
        bytes,
        reason: e.to_string(),
    })
}

/// Allocate `bytes` bytes aligned to `align`, zero-filled.
pub fn aligned_alloc(bytes: usize, align: usize) -> Result<NonNull<u8>> {
    let layout = layout(bytes, align)?;
    let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
    NonNull::new(ptr).ok_or_else(|| HcrtError::Allocation {
        bytes,
        reason: "host allocator returned null".to_string(),
    })
}

/// Free a block returned by [`aligned_alloc`].
///
/// # Safety
/// `ptr` must come from `aligned_alloc(bytes, align)` with the same arguments
/// and must not have been freed already.
pub unsafe fn aligned_free(ptr: NonNull<u8>, bytes: usize, align: usize) {
    match layout(bytes, align) {
        Ok(layout) => std::alloc::dealloc(ptr.as_ptr(), layout),
        Err(e) => {
            tracing::warn!(bytes, align, "leaking fallback block: {}", e);
            debug_assert!(false, "aligned_free with an invalid layout");
        }
    }
}

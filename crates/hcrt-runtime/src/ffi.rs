//! C entry points into the process-wide device context.
//!
//! ```c
//! const HcrtContext* ctx = hcrt_get_context();
//! if (ctx) {
//!     size_t n = hcrt_device_count(ctx);
//! }
//! ```

use crate::context::DeviceContext;

/// Opaque to C callers.
pub type HcrtContext = DeviceContext;

/// The process-wide context, initializing it on first call. Returns null if
/// initialization failed.
///
/// The returned pointer is valid until process exit.
#[no_mangle]
pub extern "C" fn hcrt_get_context() -> *const HcrtContext {
    match DeviceContext::global() {
        Ok(ctx) => ctx as *const DeviceContext,
        Err(e) => {
            tracing::error!("hcrt context initialization failed: {}", e);
            std::ptr::null()
        }
    }
}

/// Number of devices in `ctx`, or 0 if `ctx` is null.
///
/// # Safety
/// `ctx` must be null or a pointer returned by [`hcrt_get_context`].
#[no_mangle]
pub unsafe extern "C" fn hcrt_device_count(ctx: *const HcrtContext) -> usize {
    match ctx.as_ref() {
        Some(ctx) => ctx.devices().len(),
        None => 0,
    }
}

//! CPU fallback backend.
//!
//! Always available, even on machines with no accelerator. Storage is
//! over-aligned host memory and the address space is shared with the host, so
//! data movement is a plain overlap-safe byte move and mapping returns the
//! buffer address directly. Kernel launches are rejected: this backend runs
//! no device code.

pub mod alloc;
pub mod device;
pub mod queue;

pub use device::CpuFallbackDevice;
pub use queue::CpuFallbackQueue;

/// Identity path of the fallback device.
pub const FALLBACK_PATH: &str = "fallback";

//! # hcrt-runtime
//!
//! The process-facing side of the hcrt dispatch runtime.
//!
//! Provides:
//! - [`DeviceContext`]: discovers and owns every device, plus the kernel
//!   resolver shared by all launches
//! - [`cpu`]: the CPU fallback device, always present, which moves data but
//!   executes no kernels
//! - [`RuntimeConfig`]: serde-backed runtime configuration
//! - [`ffi::hcrt_get_context`]: C entry point to the process-wide context
//!
//! ```no_run
//! use hcrt_runtime::DeviceContext;
//! use hcrt_core::ExecuteOrder;
//!
//! let ctx = DeviceContext::global().unwrap();
//! let device = ctx.default_device();
//! let queue = device.clone().create_queue(ExecuteOrder::InOrder);
//! let buf = device.create(1024).unwrap();
//! queue.write(&buf, &[1, 2, 3, 4], 0, true).unwrap();
//! device.release(buf).unwrap();
//! ```

pub mod config;
pub mod context;
pub mod cpu;
pub mod ffi;

pub use config::RuntimeConfig;
pub use context::{ContextBuilder, DeviceContext, DeviceProvider};
pub use cpu::{CpuFallbackDevice, CpuFallbackQueue};

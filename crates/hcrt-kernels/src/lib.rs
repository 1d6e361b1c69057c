//! # hcrt-kernels
//!
//! Turns host-side kernel objects into device dispatches.
//!
//! Provides:
//! - [`KernelRegistry`]: explicit identity → dispatch-name registrations
//! - [`SymbolTableLocator`]: fallback lookup through loaded binaries' symbol tables
//! - [`KernelResolver`]: resolves each kernel identity once, process-wide, and caches it
//! - [`Launcher`] and [`dimensions`]: flatten a domain and submit to a queue
//! - [`Kernel`] / [`ArgumentAppender`]: the hook captured buffers are bound through

pub mod args;
pub mod launch;
pub mod locator;
pub mod registry;
pub mod resolver;
pub mod symbols;

pub use args::{ArgumentAppender, Kernel};
pub use launch::{dimensions, Launcher};
pub use locator::KernelLocator;
pub use registry::KernelRegistry;
pub use resolver::KernelResolver;
pub use symbols::{LoadedModule, SymbolTableLocator};

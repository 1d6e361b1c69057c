//! # hcrt-core
//!
//! Backend-neutral building blocks for the hcrt dispatch runtime.
//!
//! Provides:
//! - The [`Device`] and [`Queue`] traits every backend implements
//! - [`DeviceBuffer`], the opaque handle for device-addressable storage
//! - [`AsyncOp`] and the stock [`Completion`] signal
//! - Iteration domains ([`Extent`], [`TiledExtent`]) and their index types
//! - Kernel identities ([`KernelId`]) and dispatchable [`KernelHandle`]s
//! - The [`HcrtError`] taxonomy shared by every crate in the workspace

pub mod async_op;
pub mod buffer;
pub mod device;
pub mod domain;
pub mod error;
pub mod kernel;
pub mod queue;

pub use async_op::{AsyncOp, Completion};
pub use buffer::DeviceBuffer;
pub use device::{Device, DeviceId, DeviceProperties, ExecuteOrder};
pub use domain::{Domain, Extent, Index, TiledExtent, TiledIndex};
pub use error::HcrtError;
pub use kernel::{entry_point, KernelHandle, KernelId};
pub use queue::Queue;

pub type Result<T> = std::result::Result<T, HcrtError>;

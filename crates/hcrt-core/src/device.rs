//! Execution devices.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{DeviceBuffer, KernelHandle, Queue, Result};

/// Process-unique identity of a device instance.
///
/// Buffers and kernel handles carry the id of the device that produced them so
/// misuse across devices is detected instead of corrupting memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u64);

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(0);

impl DeviceId {
    /// Allocate a fresh id. Call once per constructed device.
    pub fn next() -> Self {
        DeviceId(NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// Execution order of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteOrder {
    /// Operations complete in submission order.
    #[default]
    InOrder,
    /// No ordering between independently submitted operations.
    OutOfOrder,
}

/// Snapshot of a device's static properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceProperties {
    pub path: String,
    pub description: String,
    /// Device memory in bytes. Zero means host-backed / unbounded.
    pub memory_bytes: u64,
    pub supports_double: bool,
    pub supports_limited_double: bool,
    pub unified_memory: bool,
    pub emulated: bool,
    pub version: u32,
}

/// One execution target.
///
/// A device allocates device-addressable storage, creates queues bound to
/// itself, and turns resolved kernel names into dispatchable handles. All
/// property queries are pure and stable for the device's lifetime.
///
/// Devices are owned by the device context. Queues only hold a weak
/// back-reference, so a queue can never keep its device alive.
pub trait Device: Send + Sync + fmt::Debug {
    fn id(&self) -> DeviceId;

    /// Opaque identity path, e.g. `"fallback"`.
    fn path(&self) -> &str;

    fn description(&self) -> &str;

    fn memory_size(&self) -> u64;

    fn supports_double(&self) -> bool;

    fn supports_limited_double(&self) -> bool;

    fn is_unified(&self) -> bool;

    fn is_emulated(&self) -> bool;

    fn version(&self) -> u32;

    /// Allocate `byte_count` bytes of device-addressable storage.
    fn create(&self, byte_count: usize) -> Result<DeviceBuffer>;

    /// Free storage previously returned by [`Device::create`] on this device.
    ///
    /// Consumes the handle, so a buffer cannot be released twice. Buffers from
    /// another device are rejected with [`crate::HcrtError::ForeignBuffer`].
    fn release(&self, buffer: DeviceBuffer) -> Result<()>;

    /// Create a new queue bound to this device.
    fn create_queue(self: Arc<Self>, order: ExecuteOrder) -> Arc<dyn Queue>;

    /// Turn a resolved kernel name into a handle dispatchable on `queue`.
    fn create_kernel(&self, symbol: &str, queue: &dyn Queue) -> Result<KernelHandle>;

    fn properties(&self) -> DeviceProperties {
        DeviceProperties {
            path: self.path().to_string(),
            description: self.description().to_string(),
            memory_bytes: self.memory_size(),
            supports_double: self.supports_double(),
            supports_limited_double: self.supports_limited_double(),
            unified_memory: self.is_unified(),
            emulated: self.is_emulated(),
            version: self.version(),
        }
    }
}

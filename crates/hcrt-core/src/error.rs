//! Error taxonomy for the dispatch runtime.

/// Errors surfaced by devices, queues, the kernel resolver and the device context.
///
/// Every error is returned synchronously to the calling operation. Nothing is
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HcrtError {
    #[error("allocation of {bytes} bytes failed: {reason}")]
    Allocation { bytes: usize, reason: String },

    #[error("device '{device}' does not support {operation}")]
    UnsupportedOperation {
        device: String,
        operation: &'static str,
    },

    #[error("Kernel: {kernel} is not available")]
    KernelNotFound { kernel: String },

    #[error("device context initialization failed: {0}")]
    Initialization(String),

    #[error("range of {count} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        count: usize,
        size: usize,
    },

    #[error("buffer was not allocated by device '{device}'")]
    ForeignBuffer { device: String },

    #[error("the device backing this queue has been released")]
    DeviceReleased,

    #[error("configuration error: {0}")]
    Config(String),
}

impl HcrtError {
    /// Whether repeating the same call could succeed.
    ///
    /// Only allocation failures depend on transient device state; every other
    /// variant recurs deterministically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HcrtError::Allocation { .. })
    }

    /// Shorthand for [`HcrtError::UnsupportedOperation`].
    pub fn unsupported(device: &str, operation: &'static str) -> Self {
        HcrtError::UnsupportedOperation {
            device: device.to_string(),
            operation,
        }
    }
}

//! Binding a kernel object's captured buffers to a pending dispatch.

use hcrt_core::{DeviceBuffer, KernelHandle, Queue, Result};

/// A host-side kernel object that can be launched over a domain.
///
/// The body itself lives in device code emitted under the kernel's entry
/// point. On the host the object only has to hand over the device buffers it
/// captured, in argument order. Kernels that capture nothing keep the default.
pub trait Kernel: Send + Sync + 'static {
    fn visit_arguments(&self, _args: &mut ArgumentAppender<'_>) -> Result<()> {
        Ok(())
    }
}

/// Forwards captured buffers to [`Queue::push_argument`] with consecutive indices.
pub struct ArgumentAppender<'a> {
    queue: &'a dyn Queue,
    kernel: &'a KernelHandle,
    next: usize,
}

impl<'a> ArgumentAppender<'a> {
    pub fn new(queue: &'a dyn Queue, kernel: &'a KernelHandle) -> Self {
        Self {
            queue,
            kernel,
            next: 0,
        }
    }

    /// Bind `buffer` as the next argument.
    pub fn push_buffer(&mut self, buffer: &DeviceBuffer, is_const: bool) -> Result<()> {
        self.queue
            .push_argument(self.kernel, self.next, buffer, is_const)?;
        self.next += 1;
        Ok(())
    }

    /// Number of arguments bound so far.
    pub fn pushed(&self) -> usize {
        self.next
    }
}

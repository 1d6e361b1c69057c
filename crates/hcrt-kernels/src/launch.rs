//! Launch orchestration: domain flattening and dispatch wiring.
//!
//! A launch resolves the kernel's dispatch name, creates a handle on the
//! queue's device, binds the kernel's captured buffers and finally calls the
//! queue's matching launch entry point with the flattened domain.

use std::sync::Arc;

use hcrt_core::{AsyncOp, Domain, KernelHandle, KernelId, Queue, Result};

use crate::args::{ArgumentAppender, Kernel};
use crate::resolver::KernelResolver;

/// Flatten `domain` into `(global, local)` extents, one entry per axis.
///
/// `local` is all zero for untiled domains.
pub fn dimensions<const N: usize, D: Domain<N>>(domain: &D) -> ([usize; N], [usize; N]) {
    (domain.global_extents(), domain.local_extents())
}

/// Submits kernel objects to queues.
///
/// Cheap to clone; clones share the resolver and therefore its cache.
#[derive(Debug, Clone)]
pub struct Launcher {
    resolver: Arc<KernelResolver>,
}

impl Launcher {
    pub fn new(resolver: Arc<KernelResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<KernelResolver> {
        &self.resolver
    }

    /// Launch `kernel` over `domain` and block until it completes.
    pub fn launch<const N: usize, D, K>(&self, queue: &dyn Queue, domain: &D, kernel: &K) -> Result<()>
    where
        D: Domain<N>,
        K: Kernel,
    {
        let (global, local) = dimensions(domain);
        let handle = self.make_registered_kernel::<D::Index, K>(queue, kernel)?;
        tracing::debug!(
            kernel = handle.symbol(),
            rank = N,
            ?global,
            ?local,
            "launch"
        );
        queue.launch_kernel(&handle, &global, &local)
    }

    /// Launch `kernel` over `domain` without blocking.
    pub fn launch_async<const N: usize, D, K>(
        &self,
        queue: &dyn Queue,
        domain: &D,
        kernel: &K,
    ) -> Result<Arc<dyn AsyncOp>>
    where
        D: Domain<N>,
        K: Kernel,
    {
        let (global, local) = dimensions(domain);
        let handle = self.make_registered_kernel::<D::Index, K>(queue, kernel)?;
        tracing::debug!(
            kernel = handle.symbol(),
            rank = N,
            ?global,
            ?local,
            "launch async"
        );
        queue.launch_kernel_async(&handle, &global, &local)
    }

    /// Blocking launch reserving the domain's dynamic group memory.
    pub fn launch_with_dynamic_group_memory<const N: usize, D, K>(
        &self,
        queue: &dyn Queue,
        domain: &D,
        kernel: &K,
    ) -> Result<()>
    where
        D: Domain<N>,
        K: Kernel,
    {
        let (global, local) = dimensions(domain);
        let scratch = domain.dynamic_group_segment_size();
        let handle = self.make_registered_kernel::<D::Index, K>(queue, kernel)?;
        tracing::debug!(
            kernel = handle.symbol(),
            rank = N,
            ?global,
            ?local,
            dynamic_group_bytes = scratch,
            "launch"
        );
        queue.launch_kernel_with_dynamic_group_memory(&handle, &global, &local, scratch)
    }

    /// Non-blocking launch reserving the domain's dynamic group memory.
    pub fn launch_with_dynamic_group_memory_async<const N: usize, D, K>(
        &self,
        queue: &dyn Queue,
        domain: &D,
        kernel: &K,
    ) -> Result<Arc<dyn AsyncOp>>
    where
        D: Domain<N>,
        K: Kernel,
    {
        let (global, local) = dimensions(domain);
        let scratch = domain.dynamic_group_segment_size();
        let handle = self.make_registered_kernel::<D::Index, K>(queue, kernel)?;
        tracing::debug!(
            kernel = handle.symbol(),
            rank = N,
            ?global,
            ?local,
            dynamic_group_bytes = scratch,
            "launch async"
        );
        queue.launch_kernel_with_dynamic_group_memory_async(&handle, &global, &local, scratch)
    }

    fn make_registered_kernel<I: 'static, K: Kernel>(
        &self,
        queue: &dyn Queue,
        kernel: &K,
    ) -> Result<KernelHandle> {
        let symbol = self.resolver.resolve(&KernelId::of::<I, K>())?;
        let handle = queue.device()?.create_kernel(&symbol, queue)?;

        let mut args = ArgumentAppender::new(queue, &handle);
        kernel.visit_arguments(&mut args)?;
        tracing::trace!(kernel = %symbol, arguments = args.pushed(), "arguments bound");

        Ok(handle)
    }
}

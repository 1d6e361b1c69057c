//! Explicit kernel registrations.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use hcrt_core::KernelId;
use parking_lot::RwLock;

use crate::locator::KernelLocator;

/// Startup-time table of kernel identity → dispatch name.
///
/// Code generators (or hand-written bindings) register every kernel they emit
/// before the first launch. Lookups take a read lock only.
#[derive(Default)]
pub struct KernelRegistry {
    entries: RwLock<HashMap<TypeId, Arc<str>>>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the dispatch name of kernel `K` launched with index type `I`.
    ///
    /// Returns the previously registered name, if any.
    pub fn register<I: 'static, K: 'static>(&self, symbol: impl Into<Arc<str>>) -> Option<Arc<str>> {
        self.register_id(&KernelId::of::<I, K>(), symbol)
    }

    pub fn register_id(&self, kernel: &KernelId, symbol: impl Into<Arc<str>>) -> Option<Arc<str>> {
        let symbol = symbol.into();
        tracing::debug!(kernel = %kernel, symbol = %symbol, "registered kernel");
        self.entries.write().insert(kernel.type_id(), symbol)
    }

    pub fn get(&self, kernel: &KernelId) -> Option<Arc<str>> {
        self.entries.read().get(&kernel.type_id()).cloned()
    }

    pub fn contains(&self, kernel: &KernelId) -> bool {
        self.entries.read().contains_key(&kernel.type_id())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KernelLocator for KernelRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    fn locate(&self, kernel: &KernelId) -> Option<String> {
        self.get(kernel).map(|s| s.to_string())
    }
}

impl std::fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("kernels", &self.len())
            .finish()
    }
}

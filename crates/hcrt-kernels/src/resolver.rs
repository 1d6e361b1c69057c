//! One-time kernel resolution with a process-lifetime cache.
//!
//! Each kernel identity gets its own once-cell. The first caller runs the
//! locator chain; concurrent callers for the same identity block on the cell
//! and then read the published result. Different identities resolve in
//! parallel: the map lock is only held long enough to fetch the cell.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use hcrt_core::{HcrtError, KernelId, Result};
use parking_lot::Mutex;

use crate::locator::KernelLocator;
use crate::registry::KernelRegistry;
use crate::symbols::SymbolTableLocator;

/// Outcome of the single resolution attempt for one identity.
/// `None` records a miss, which is served again without rescanning.
type Slot = Arc<OnceLock<Option<Arc<str>>>>;

/// Maps kernel identities to dispatch names, resolving each identity once.
pub struct KernelResolver {
    locators: Vec<Arc<dyn KernelLocator>>,
    cache: Mutex<HashMap<TypeId, Slot>>,
    scans: AtomicUsize,
}

impl KernelResolver {
    /// A resolver with no locators; every identity misses.
    pub fn new() -> Self {
        Self {
            locators: Vec::new(),
            cache: Mutex::new(HashMap::new()),
            scans: AtomicUsize::new(0),
        }
    }

    /// Explicit registry first, then (optionally) the symbol-table scan.
    pub fn standard(registry: Arc<KernelRegistry>, symbol_scan: bool) -> Self {
        let resolver = Self::new().with_locator(registry);
        if symbol_scan {
            resolver.with_locator(Arc::new(SymbolTableLocator::new()))
        } else {
            resolver
        }
    }

    /// Append a locator. Locators are tried in the order they were added.
    pub fn with_locator(mut self, locator: Arc<dyn KernelLocator>) -> Self {
        self.locators.push(locator);
        self
    }

    /// Dispatch name for `kernel`.
    ///
    /// Fails with [`HcrtError::KernelNotFound`] if no locator knows the
    /// identity. The failure is cached too: later calls fail the same way
    /// without scanning again.
    pub fn resolve(&self, kernel: &KernelId) -> Result<Arc<str>> {
        let slot = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.entry(kernel.type_id()).or_default())
        };

        slot.get_or_init(|| self.scan(kernel))
            .clone()
            .ok_or_else(|| HcrtError::KernelNotFound {
                kernel: kernel.to_string(),
            })
    }

    /// Dispatch name for kernel `K` launched with index type `I`.
    pub fn resolve_for<I: 'static, K: 'static>(&self) -> Result<Arc<str>> {
        self.resolve(&KernelId::of::<I, K>())
    }

    /// Cached outcome for `kernel`, without resolving.
    ///
    /// `None` if the identity has not been resolved yet (or is mid-resolution);
    /// `Some(None)` for a cached miss.
    pub fn cached(&self, kernel: &KernelId) -> Option<Option<Arc<str>>> {
        let cache = self.cache.lock();
        cache.get(&kernel.type_id()).and_then(|slot| slot.get().cloned())
    }

    /// Number of locator-chain passes run so far.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Acquire)
    }

    fn scan(&self, kernel: &KernelId) -> Option<Arc<str>> {
        self.scans.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(kernel = %kernel, "resolving kernel");

        for locator in &self.locators {
            if let Some(symbol) = locator.locate(kernel) {
                tracing::debug!(
                    kernel = %kernel,
                    locator = locator.name(),
                    symbol = %symbol,
                    "kernel resolved"
                );
                return Some(Arc::from(symbol));
            }
            tracing::trace!(kernel = %kernel, locator = locator.name(), "no match");
        }

        tracing::warn!(kernel = %kernel, "kernel is not available from any locator");
        None
    }
}

impl Default for KernelResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KernelResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.locators.iter().map(|l| l.name()).collect();
        f.debug_struct("KernelResolver")
            .field("locators", &names)
            .field("cached", &self.cache.lock().len())
            .field("scans", &self.scan_count())
            .finish()
    }
}

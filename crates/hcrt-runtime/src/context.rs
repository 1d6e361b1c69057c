//! The device context: one registry of every discovered device.
//!
//! A context is built explicitly (`DeviceContext::new`, `DeviceContext::builder`)
//! and tears its devices down when dropped, or lazily through
//! [`DeviceContext::global`], which lives until the process exits.

use std::sync::{Arc, OnceLock};

use hcrt_core::{Device, HcrtError, Queue, Result};
use hcrt_kernels::{KernelRegistry, KernelResolver, Launcher};

use crate::config::RuntimeConfig;
use crate::cpu::CpuFallbackDevice;

/// Source of accelerator devices, consulted while a context is built.
pub trait DeviceProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Devices this backend found, in its preferred order.
    fn discover(&self) -> Result<Vec<Arc<dyn Device>>>;
}

static GLOBAL: OnceLock<std::result::Result<DeviceContext, HcrtError>> = OnceLock::new();

/// Owns every device for its lifetime and the kernel resolver shared by all
/// launches through it.
///
/// The device list is fixed at construction, so concurrent readers need no
/// locking. It always ends with the CPU fallback device.
pub struct DeviceContext {
    devices: Vec<Arc<dyn Device>>,
    registry: Arc<KernelRegistry>,
    resolver: Arc<KernelResolver>,
    config: RuntimeConfig,
}

impl DeviceContext {
    /// Context with no accelerator providers: just the CPU fallback.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: RuntimeConfig) -> ContextBuilder {
        ContextBuilder {
            config,
            providers: Vec::new(),
            registry: None,
        }
    }

    /// The process-wide context, built on first use from [`RuntimeConfig::from_env`].
    ///
    /// An unreadable or invalid config is logged and replaced by the defaults,
    /// so this only fails if the fallback device itself cannot be built.
    /// Initialization runs once; a failure is returned to every caller.
    pub fn global() -> Result<&'static DeviceContext> {
        GLOBAL
            .get_or_init(|| DeviceContext::new(global_config()))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Every device, in discovery order. Never empty.
    pub fn devices(&self) -> &[Arc<dyn Device>] {
        &self.devices
    }

    /// First discovered device: the best accelerator if any, else the fallback.
    pub fn default_device(&self) -> &Arc<dyn Device> {
        &self.devices[0]
    }

    /// The CPU fallback device.
    pub fn fallback_device(&self) -> &Arc<dyn Device> {
        &self.devices[self.devices.len() - 1]
    }

    pub fn device_by_path(&self, path: &str) -> Option<&Arc<dyn Device>> {
        self.devices.iter().find(|d| d.path() == path)
    }

    /// New queue on the default device, using the configured order.
    pub fn default_queue(&self) -> Arc<dyn Queue> {
        Arc::clone(self.default_device()).create_queue(self.config.default_queue_order)
    }

    /// Explicit kernel registrations consulted before any symbol scan.
    pub fn registry(&self) -> &Arc<KernelRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &Arc<KernelResolver> {
        &self.resolver
    }

    /// Launcher sharing this context's resolver cache.
    pub fn launcher(&self) -> Launcher {
        Launcher::new(Arc::clone(&self.resolver))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Tear the context down now. Equivalent to dropping it.
    pub fn shutdown(self) {
        drop(self)
    }
}

fn global_config() -> RuntimeConfig {
    RuntimeConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("ignoring runtime config, using defaults: {}", e);
        RuntimeConfig::default()
    })
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        // Reverse of discovery order.
        while let Some(device) = self.devices.pop() {
            tracing::debug!(device = device.path(), "releasing device");
            if Arc::strong_count(&device) > 1 {
                tracing::warn!(
                    device = device.path(),
                    "device still referenced outside the context at teardown"
                );
            }
        }
    }
}

impl std::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths: Vec<&str> = self.devices.iter().map(|d| d.path()).collect();
        f.debug_struct("DeviceContext")
            .field("devices", &paths)
            .field("resolver", &self.resolver)
            .finish()
    }
}

/// Builder collecting device providers before discovery runs.
pub struct ContextBuilder {
    config: RuntimeConfig,
    providers: Vec<Box<dyn DeviceProvider>>,
    registry: Option<Arc<KernelRegistry>>,
}

impl ContextBuilder {
    /// Add an accelerator provider. Providers are consulted in the order added.
    pub fn provider(mut self, provider: impl DeviceProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Use an existing registry instead of an empty one.
    pub fn registry(mut self, registry: Arc<KernelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Run discovery and build the context.
    ///
    /// A provider that fails is logged and skipped. The CPU fallback is
    /// appended last; if even that cannot be built, initialization fails.
    pub fn build(self) -> Result<DeviceContext> {
        self.config
            .validate()
            .map_err(|e| HcrtError::Initialization(e.to_string()))?;

        let mut devices: Vec<Arc<dyn Device>> = Vec::new();
        for provider in &self.providers {
            match provider.discover() {
                Ok(found) => {
                    tracing::info!(provider = provider.name(), count = found.len(), "discovered devices");
                    devices.extend(found);
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), "device discovery failed: {}", e);
                }
            }
        }

        let fallback = CpuFallbackDevice::new(self.config.fallback_alignment)?;
        devices.push(Arc::new(fallback));

        for (i, device) in devices.iter().enumerate() {
            tracing::debug!(
                index = i,
                path = device.path(),
                description = device.description(),
                "registered device"
            );
        }

        let registry = self.registry.unwrap_or_default();
        let resolver = KernelResolver::standard(Arc::clone(&registry), self.config.symbol_scan);

        Ok(DeviceContext {
            devices,
            registry,
            resolver: Arc::new(resolver),
            config: self.config,
        })
    }
}

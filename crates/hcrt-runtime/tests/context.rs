//! Device discovery and teardown.
//! Run with: cargo test -p hcrt-runtime --test context

use std::sync::{Arc, Weak};

use hcrt_core::{Device, DeviceBuffer, DeviceId, ExecuteOrder, HcrtError, KernelHandle, Queue, Result};
use hcrt_runtime::{CpuFallbackQueue, DeviceContext, DeviceProvider, RuntimeConfig};
use parking_lot::Mutex;

type DropLog = Arc<Mutex<Vec<String>>>;

/// Stand-in accelerator that records when it is dropped.
#[derive(Debug)]
struct TrackedDevice {
    id: DeviceId,
    path: String,
    log: DropLog,
}

impl Drop for TrackedDevice {
    fn drop(&mut self) {
        self.log.lock().push(self.path.clone());
    }
}

impl Device for TrackedDevice {
    fn id(&self) -> DeviceId {
        self.id
    }
    fn path(&self) -> &str {
        &self.path
    }
    fn description(&self) -> &str {
        "Tracked test accelerator"
    }
    fn memory_size(&self) -> u64 {
        1 << 30
    }
    fn supports_double(&self) -> bool {
        false
    }
    fn supports_limited_double(&self) -> bool {
        true
    }
    fn is_unified(&self) -> bool {
        false
    }
    fn is_emulated(&self) -> bool {
        false
    }
    fn version(&self) -> u32 {
        2
    }
    fn create(&self, byte_count: usize) -> Result<DeviceBuffer> {
        Err(HcrtError::Allocation {
            bytes: byte_count,
            reason: "tracked device has no memory".into(),
        })
    }
    fn release(&self, _buffer: DeviceBuffer) -> Result<()> {
        Err(HcrtError::ForeignBuffer {
            device: self.path.clone(),
        })
    }
    fn create_queue(self: Arc<Self>, order: ExecuteOrder) -> Arc<dyn Queue> {
        let weak: Weak<dyn Device> = Arc::downgrade(&self) as Weak<dyn Device>;
        Arc::new(CpuFallbackQueue::new(weak, self.id, order))
    }
    fn create_kernel(&self, symbol: &str, _queue: &dyn Queue) -> Result<KernelHandle> {
        Ok(KernelHandle::new(symbol, self.id, 1))
    }
}

struct TrackedProvider {
    paths: Vec<&'static str>,
    log: DropLog,
}

impl DeviceProvider for TrackedProvider {
    fn name(&self) -> &str {
        "tracked"
    }

    fn discover(&self) -> Result<Vec<Arc<dyn Device>>> {
        Ok(self
            .paths
            .iter()
            .map(|p| {
                Arc::new(TrackedDevice {
                    id: DeviceId::next(),
                    path: p.to_string(),
                    log: Arc::clone(&self.log),
                }) as Arc<dyn Device>
            })
            .collect())
    }
}

struct BrokenProvider;

impl DeviceProvider for BrokenProvider {
    fn name(&self) -> &str {
        "broken"
    }

    fn discover(&self) -> Result<Vec<Arc<dyn Device>>> {
        Err(HcrtError::Initialization("driver not loaded".into()))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_discovery_order_and_fallback_last() {
    init_tracing();
    let log = DropLog::default();
    let ctx = DeviceContext::builder(RuntimeConfig::default())
        .provider(TrackedProvider {
            paths: vec!["gpu0", "gpu1"],
            log: Arc::clone(&log),
        })
        .build()
        .unwrap();

    let paths: Vec<&str> = ctx.devices().iter().map(|d| d.path()).collect();
    assert_eq!(paths, ["gpu0", "gpu1", "fallback"]);
    assert_eq!(ctx.default_device().path(), "gpu0");
    assert_eq!(ctx.fallback_device().path(), "fallback");
    assert_eq!(ctx.device_by_path("gpu1").unwrap().version(), 2);
}

#[test]
fn test_failed_provider_is_skipped() {
    init_tracing();
    let log = DropLog::default();
    let ctx = DeviceContext::builder(RuntimeConfig::default())
        .provider(BrokenProvider)
        .provider(TrackedProvider {
            paths: vec!["gpu0"],
            log,
        })
        .build()
        .unwrap();

    let paths: Vec<&str> = ctx.devices().iter().map(|d| d.path()).collect();
    assert_eq!(paths, ["gpu0", "fallback"]);
}

#[test]
fn test_teardown_in_reverse_discovery_order() {
    let log = DropLog::default();
    let ctx = DeviceContext::builder(RuntimeConfig::default())
        .provider(TrackedProvider {
            paths: vec!["gpu0", "gpu1", "gpu2"],
            log: Arc::clone(&log),
        })
        .build()
        .unwrap();

    assert!(log.lock().is_empty());
    ctx.shutdown();
    assert_eq!(*log.lock(), ["gpu2", "gpu1", "gpu0"]);
}

#[test]
fn test_queue_does_not_keep_device_alive() {
    let log = DropLog::default();
    let ctx = DeviceContext::builder(RuntimeConfig::default())
        .provider(TrackedProvider {
            paths: vec!["gpu0"],
            log: Arc::clone(&log),
        })
        .build()
        .unwrap();

    let queue = ctx.default_queue();
    assert_eq!(queue.device().unwrap().path(), "gpu0");
    drop(ctx);

    assert_eq!(*log.lock(), ["gpu0"]);
    assert_eq!(queue.device().unwrap_err(), HcrtError::DeviceReleased);
}

#[test]
fn test_default_device_allocation_failure_is_retryable() {
    let ctx = DeviceContext::builder(RuntimeConfig::default())
        .provider(TrackedProvider {
            paths: vec!["gpu0"],
            log: DropLog::default(),
        })
        .build()
        .unwrap();

    let err = ctx.default_device().create(64).unwrap_err();
    assert!(err.is_retryable());
    assert!(ctx.fallback_device().create(64).is_ok_and(|buf| {
        ctx.fallback_device().release(buf).is_ok()
    }));
}

#[test]
fn test_global_context_is_shared() {
    let a = DeviceContext::global().unwrap();
    let b = DeviceContext::global().unwrap();
    assert!(std::ptr::eq(a, b));
    assert_eq!(a.fallback_device().path(), "fallback");
}

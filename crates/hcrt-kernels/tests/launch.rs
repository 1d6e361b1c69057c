//! Launch orchestration against a recording backend.
//! Run with: cargo test -p hcrt-kernels --test launch

use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use hcrt_core::{
    AsyncOp, Completion, Device, DeviceBuffer, DeviceId, ExecuteOrder, Extent, HcrtError, Index,
    KernelHandle, Queue, Result, TiledIndex,
};
use hcrt_kernels::{ArgumentAppender, Kernel, KernelRegistry, KernelResolver, Launcher};
use parking_lot::Mutex;

// ============================================================================
// Recording backend
// ============================================================================

#[derive(Debug)]
struct RecordingDevice {
    id: DeviceId,
}

impl RecordingDevice {
    fn new() -> Arc<Self> {
        Arc::new(Self { id: DeviceId::next() })
    }
}

impl Device for RecordingDevice {
    fn id(&self) -> DeviceId {
        self.id
    }
    fn path(&self) -> &str {
        "recording"
    }
    fn description(&self) -> &str {
        "Recording test device"
    }
    fn memory_size(&self) -> u64 {
        0
    }
    fn supports_double(&self) -> bool {
        true
    }
    fn supports_limited_double(&self) -> bool {
        true
    }
    fn is_unified(&self) -> bool {
        true
    }
    fn is_emulated(&self) -> bool {
        true
    }
    fn version(&self) -> u32 {
        1
    }

    fn create(&self, byte_count: usize) -> Result<DeviceBuffer> {
        let storage: &'static mut [u8] = Box::leak(vec![0u8; byte_count.max(1)].into_boxed_slice());
        let ptr = NonNull::new(storage.as_mut_ptr()).unwrap();
        Ok(unsafe { DeviceBuffer::from_raw_parts(ptr, byte_count, self.id) })
    }

    fn release(&self, buffer: DeviceBuffer) -> Result<()> {
        let (ptr, len, _) = buffer.into_raw_parts();
        let slice = std::ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len.max(1));
        drop(unsafe { Box::from_raw(slice) });
        Ok(())
    }

    fn create_queue(self: Arc<Self>, order: ExecuteOrder) -> Arc<dyn Queue> {
        Arc::new(RecordingQueue::new(&self, order))
    }

    fn create_kernel(&self, symbol: &str, _queue: &dyn Queue) -> Result<KernelHandle> {
        Ok(KernelHandle::new(symbol, self.id, 0xC0FFEE))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Submission {
    entry: &'static str,
    symbol: String,
    global: Vec<usize>,
    local: Vec<usize>,
    dynamic_group_bytes: Option<usize>,
}

#[derive(Debug)]
struct RecordingQueue {
    device: Weak<dyn Device>,
    order: ExecuteOrder,
    submissions: Mutex<Vec<Submission>>,
    arguments: Mutex<Vec<(usize, bool)>>,
}

impl RecordingQueue {
    fn new(device: &Arc<RecordingDevice>, order: ExecuteOrder) -> Self {
        let weak: Weak<dyn Device> = Arc::downgrade(device) as Weak<dyn Device>;
        Self {
            device: weak,
            order,
            submissions: Mutex::new(Vec::new()),
            arguments: Mutex::new(Vec::new()),
        }
    }

    fn record(
        &self,
        entry: &'static str,
        kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
        dynamic_group_bytes: Option<usize>,
    ) {
        self.submissions.lock().push(Submission {
            entry,
            symbol: kernel.symbol().to_string(),
            global: global.to_vec(),
            local: local.to_vec(),
            dynamic_group_bytes,
        });
    }

    fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }
}

impl Queue for RecordingQueue {
    fn device(&self) -> Result<Arc<dyn Device>> {
        self.device.upgrade().ok_or(HcrtError::DeviceReleased)
    }

    fn order(&self) -> ExecuteOrder {
        self.order
    }

    fn launch_kernel(&self, kernel: &KernelHandle, global: &[usize], local: &[usize]) -> Result<()> {
        self.record("launch_kernel", kernel, global, local, None);
        Ok(())
    }

    fn launch_kernel_async(
        &self,
        kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
    ) -> Result<Arc<dyn AsyncOp>> {
        self.record("launch_kernel_async", kernel, global, local, None);
        Ok(Arc::new(Completion::finished(Ok(()))))
    }

    fn launch_kernel_with_dynamic_group_memory(
        &self,
        kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
        dynamic_group_bytes: usize,
    ) -> Result<()> {
        self.record("launch_kernel_dgm", kernel, global, local, Some(dynamic_group_bytes));
        Ok(())
    }

    fn launch_kernel_with_dynamic_group_memory_async(
        &self,
        kernel: &KernelHandle,
        global: &[usize],
        local: &[usize],
        dynamic_group_bytes: usize,
    ) -> Result<Arc<dyn AsyncOp>> {
        self.record("launch_kernel_dgm_async", kernel, global, local, Some(dynamic_group_bytes));
        Ok(Arc::new(Completion::finished(Ok(()))))
    }

    fn read(&self, _buffer: &DeviceBuffer, _dst: &mut [u8], _offset: usize) -> Result<()> {
        Ok(())
    }

    fn write(&self, _buffer: &DeviceBuffer, _src: &[u8], _offset: usize, _blocking: bool) -> Result<()> {
        Ok(())
    }

    fn copy(
        &self,
        _src: &DeviceBuffer,
        _dst: &DeviceBuffer,
        _count: usize,
        _src_offset: usize,
        _dst_offset: usize,
        _blocking: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn map(&self, buffer: &DeviceBuffer, count: usize, offset: usize, _modify: bool) -> Result<NonNull<u8>> {
        buffer.address_at(offset, count)
    }

    fn unmap(
        &self,
        _buffer: &DeviceBuffer,
        _addr: NonNull<u8>,
        _count: usize,
        _offset: usize,
        _modify: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn push_argument(
        &self,
        _kernel: &KernelHandle,
        index: usize,
        _buffer: &DeviceBuffer,
        is_const: bool,
    ) -> Result<()> {
        self.arguments.lock().push((index, is_const));
        Ok(())
    }
}

// ============================================================================
// Kernels
// ============================================================================

struct Fill;
impl Kernel for Fill {}

struct Saxpy {
    x: DeviceBuffer,
    y: DeviceBuffer,
}

impl Kernel for Saxpy {
    fn visit_arguments(&self, args: &mut ArgumentAppender<'_>) -> Result<()> {
        args.push_buffer(&self.x, true)?;
        args.push_buffer(&self.y, false)
    }
}

struct Unregistered;
impl Kernel for Unregistered {}

fn launcher_with(registry: KernelRegistry) -> Launcher {
    let resolver = KernelResolver::standard(Arc::new(registry), false);
    Launcher::new(Arc::new(resolver))
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_launch_passes_flattened_domain() {
    let registry = KernelRegistry::new();
    registry.register::<Index<2>, Fill>("fill_2d");
    let launcher = launcher_with(registry);

    let device = RecordingDevice::new();
    let queue = RecordingQueue::new(&device, ExecuteOrder::InOrder);

    launcher.launch(&queue, &Extent::new([128, 64]), &Fill).unwrap();

    assert_eq!(
        queue.submissions(),
        vec![Submission {
            entry: "launch_kernel",
            symbol: "fill_2d".into(),
            global: vec![128, 64],
            local: vec![0, 0],
            dynamic_group_bytes: None,
        }]
    );
}

#[test]
fn test_tiled_launch_uses_tiled_identity_and_tile_extents() {
    let registry = KernelRegistry::new();
    registry.register::<Index<1>, Fill>("fill_flat");
    registry.register::<TiledIndex<1>, Fill>("fill_tiled");
    let launcher = launcher_with(registry);

    let device = RecordingDevice::new();
    let queue = RecordingQueue::new(&device, ExecuteOrder::InOrder);

    launcher.launch(&queue, &Extent::new([256]).tile([64]), &Fill).unwrap();
    launcher.launch(&queue, &Extent::new([256]), &Fill).unwrap();

    let subs = queue.submissions();
    assert_eq!(subs[0].symbol, "fill_tiled");
    assert_eq!(subs[0].local, vec![64]);
    assert_eq!(subs[1].symbol, "fill_flat");
    assert_eq!(subs[1].local, vec![0]);
}

#[test]
fn test_async_launch_returns_op() {
    let registry = KernelRegistry::new();
    registry.register::<Index<3>, Fill>("fill_3d");
    let launcher = launcher_with(registry);

    let device = RecordingDevice::new();
    let queue = RecordingQueue::new(&device, ExecuteOrder::OutOfOrder);

    let op = launcher.launch_async(&queue, &Extent::new([4, 4, 4]), &Fill).unwrap();
    assert_eq!(op.wait(), Ok(()));
    assert_eq!(queue.submissions()[0].entry, "launch_kernel_async");
    assert_eq!(queue.submissions()[0].global, vec![4, 4, 4]);
}

#[test]
fn test_dynamic_group_memory_forwarded_from_domain() {
    let registry = KernelRegistry::new();
    registry.register::<TiledIndex<2>, Fill>("fill_scratch");
    let launcher = launcher_with(registry);

    let device = RecordingDevice::new();
    let queue = RecordingQueue::new(&device, ExecuteOrder::InOrder);
    let domain = Extent::new([32, 32]).tile([16, 16]).with_dynamic_group_memory(4096);

    launcher.launch_with_dynamic_group_memory(&queue, &domain, &Fill).unwrap();
    let op = launcher
        .launch_with_dynamic_group_memory_async(&queue, &domain, &Fill)
        .unwrap();
    op.wait().unwrap();

    let subs = queue.submissions();
    assert_eq!(subs.len(), 2);
    assert_eq!(subs[0].entry, "launch_kernel_dgm");
    assert_eq!(subs[0].dynamic_group_bytes, Some(4096));
    assert_eq!(subs[1].entry, "launch_kernel_dgm_async");
    assert_eq!(subs[1].dynamic_group_bytes, Some(4096));
    assert_eq!(subs[1].local, vec![16, 16]);
}

#[test]
fn test_captured_buffers_bound_in_order() {
    let registry = KernelRegistry::new();
    registry.register::<Index<1>, Saxpy>("saxpy");
    let launcher = launcher_with(registry);

    let device = RecordingDevice::new();
    let queue = RecordingQueue::new(&device, ExecuteOrder::InOrder);
    let kernel = Saxpy {
        x: device.create(64).unwrap(),
        y: device.create(64).unwrap(),
    };

    launcher.launch(&queue, &Extent::new([16]), &kernel).unwrap();
    assert_eq!(*queue.arguments.lock(), vec![(0, true), (1, false)]);

    let Saxpy { x, y } = kernel;
    device.release(x).unwrap();
    device.release(y).unwrap();
}

#[test]
fn test_unresolved_kernel_never_reaches_queue() {
    let launcher = launcher_with(KernelRegistry::new());
    let device = RecordingDevice::new();
    let queue = RecordingQueue::new(&device, ExecuteOrder::InOrder);

    let err = launcher
        .launch(&queue, &Extent::new([8]), &Unregistered)
        .unwrap_err();
    assert!(matches!(err, HcrtError::KernelNotFound { .. }));
    assert!(queue.submissions().is_empty());
}

#[test]
fn test_launch_after_device_released() {
    let registry = KernelRegistry::new();
    registry.register::<Index<1>, Fill>("fill");
    let launcher = launcher_with(registry);

    let device = RecordingDevice::new();
    let queue = RecordingQueue::new(&device, ExecuteOrder::InOrder);
    drop(device);

    let err = launcher.launch(&queue, &Extent::new([8]), &Fill).unwrap_err();
    assert_eq!(err, HcrtError::DeviceReleased);
}

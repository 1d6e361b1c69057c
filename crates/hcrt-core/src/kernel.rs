//! Kernel identities and dispatchable handles.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::DeviceId;

/// Per-identity device entry point.
///
/// Each `(index type, kernel type)` pair monomorphizes its own copy of this
/// function. The code generator emits the device body under the same symbol,
/// so the address of the host copy is what a symbol-table scan looks for.
/// On the host it only touches its arguments. The body mentions both type
/// ids so no two identities compile to identical code and get folded into
/// one address.
#[inline(never)]
pub fn entry_point<I: 'static, K: 'static>(kernel: &K) {
    std::hint::black_box((TypeId::of::<I>(), TypeId::of::<K>(), kernel as *const K));
}

/// Compile-time identity of one kernel body launched with one index type.
///
/// Two launches share an identity only if both the kernel type and the
/// domain's index type match.
#[derive(Clone, Copy)]
pub struct KernelId {
    type_id: TypeId,
    kernel_name: &'static str,
    index_name: &'static str,
    entry: usize,
}

impl KernelId {
    /// Identity of kernel `K` invoked with index type `I`.
    pub fn of<I: 'static, K: 'static>() -> Self {
        let entry: fn(&K) = entry_point::<I, K>;
        Self {
            type_id: TypeId::of::<(I, K)>(),
            kernel_name: type_name::<K>(),
            index_name: type_name::<I>(),
            entry: entry as usize,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel_name
    }

    pub fn index_name(&self) -> &'static str {
        self.index_name
    }

    /// Runtime address of this identity's [`entry_point`].
    pub fn entry_address(&self) -> usize {
        self.entry
    }
}

impl PartialEq for KernelId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for KernelId {}

impl Hash for KernelId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.kernel_name, self.index_name)
    }
}

impl fmt::Debug for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelId")
            .field("kernel", &self.kernel_name)
            .field("index", &self.index_name)
            .field("entry", &format_args!("{:#x}", self.entry))
            .finish()
    }
}

/// Device-specific dispatchable kernel, produced by [`crate::Device::create_kernel`].
///
/// `raw` is an opaque backend token (a function pointer, a module handle, ...).
/// Backends with nothing to store leave it at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelHandle {
    symbol: Arc<str>,
    device: DeviceId,
    raw: u64,
}

impl KernelHandle {
    pub fn new(symbol: impl Into<Arc<str>>, device: DeviceId, raw: u64) -> Self {
        Self {
            symbol: symbol.into(),
            device,
            raw,
        }
    }

    /// Linkage name the handle was created from.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }
}

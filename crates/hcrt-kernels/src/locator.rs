//! Strategy interface for finding a kernel's dispatch name.

use hcrt_core::KernelId;

/// One way of mapping a kernel identity to the name its device code was
/// emitted under.
///
/// The resolver tries locators in order and stops at the first hit, so
/// platform-specific strategies can be swapped without touching dispatch.
pub trait KernelLocator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// The dispatch name for `kernel`, or `None` if this strategy has no answer.
    fn locate(&self, kernel: &KernelId) -> Option<String>;
}

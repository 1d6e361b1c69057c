//! Kernel lookup through the symbol tables of loaded binaries.
//!
//! Device entry points are emitted as function symbols in the binary image.
//! Given a kernel identity's runtime entry address, walk every loaded module
//! in load order, relocate each function symbol by the module's base address
//! and return the linkage name of the one that matches.

use std::path::{Path, PathBuf};

use hcrt_core::KernelId;
use object::{Object, ObjectSymbol, SymbolKind};

use crate::locator::KernelLocator;

/// A binary module mapped into the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// Load bias added to every symbol value.
    pub base: u64,
    /// File the module was loaded from.
    pub path: PathBuf,
}

/// Every loaded module in load order, main executable first.
#[cfg(target_os = "linux")]
pub fn loaded_modules() -> Vec<LoadedModule> {
    use std::ffi::CStr;

    unsafe extern "C" fn collect(
        info: *mut libc::dl_phdr_info,
        _size: libc::size_t,
        data: *mut libc::c_void,
    ) -> libc::c_int {
        let modules = &mut *(data as *mut Vec<LoadedModule>);
        let info = &*info;
        let name = if info.dlpi_name.is_null() {
            ""
        } else {
            CStr::from_ptr(info.dlpi_name).to_str().unwrap_or("")
        };
        // The main executable is reported first, without a name.
        let path = match (name.is_empty(), modules.is_empty()) {
            (false, _) => PathBuf::from(name),
            (true, true) => PathBuf::from("/proc/self/exe"),
            (true, false) => return 0,
        };
        modules.push(LoadedModule {
            base: info.dlpi_addr as u64,
            path,
        });
        0
    }

    let mut modules: Vec<LoadedModule> = Vec::new();
    unsafe {
        libc::dl_iterate_phdr(
            Some(collect),
            &mut modules as *mut Vec<LoadedModule> as *mut libc::c_void,
        );
    }
    modules
}

#[cfg(not(target_os = "linux"))]
pub fn loaded_modules() -> Vec<LoadedModule> {
    Vec::new()
}

/// Linkage name of the function symbol in `module` that lands on `address`.
///
/// Modules that cannot be read or parsed (the vDSO, deleted files) yield `None`.
pub fn function_symbol_at(module: &LoadedModule, address: u64) -> Option<String> {
    let data = match std::fs::read(&module.path) {
        Ok(data) => data,
        Err(e) => {
            tracing::trace!(path = %module.path.display(), "skipping module: {}", e);
            return None;
        }
    };
    let file = object::File::parse(&*data).ok()?;
    file.symbols()
        .filter(|sym| sym.kind() == SymbolKind::Text && sym.is_definition())
        .find(|sym| module.base.wrapping_add(sym.address()) == address)
        .and_then(|sym| sym.name().ok().map(str::to_owned))
}

/// Search every loaded module, in load order, for a function at `address`.
pub fn find_function_symbol(address: u64) -> Option<String> {
    loaded_modules()
        .iter()
        .find_map(|module| function_symbol_at(module, address))
}

/// [`KernelLocator`] backed by the process's loaded binaries.
///
/// Requires the entry point symbols to be present in a symbol table, i.e. a
/// binary that has not been stripped. Only implemented on Linux; elsewhere it
/// never finds anything.
#[derive(Debug, Default, Clone)]
pub struct SymbolTableLocator {
    /// Restrict the scan to these modules instead of everything loaded.
    modules: Option<Vec<LoadedModule>>,
}

impl SymbolTableLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan only `path`, loaded at `base`.
    pub fn with_module(path: impl AsRef<Path>, base: u64) -> Self {
        Self {
            modules: Some(vec![LoadedModule {
                base,
                path: path.as_ref().to_path_buf(),
            }]),
        }
    }
}

impl KernelLocator for SymbolTableLocator {
    fn name(&self) -> &str {
        "symbol-table"
    }

    fn locate(&self, kernel: &KernelId) -> Option<String> {
        let address = kernel.entry_address() as u64;
        match &self.modules {
            Some(modules) => modules.iter().find_map(|m| function_symbol_at(m, address)),
            None => find_function_symbol(address),
        }
    }
}

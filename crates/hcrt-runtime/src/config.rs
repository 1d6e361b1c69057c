//! Runtime configuration.

use std::path::Path;

use hcrt_core::{ExecuteOrder, HcrtError, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "HCRT_CONFIG";

/// Configuration read once when a device context is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Alignment of CPU fallback allocations, in bytes. Power of two.
    pub fallback_alignment: usize,

    /// Order used by [`crate::DeviceContext::default_queue`].
    pub default_queue_order: ExecuteOrder,

    /// Fall back to scanning loaded binaries' symbol tables for kernels that
    /// were not registered explicitly.
    pub symbol_scan: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fallback_alignment: 0x1000,
            default_queue_order: ExecuteOrder::InOrder,
            symbol_scan: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| HcrtError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HcrtError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Load from the file named by `HCRT_CONFIG`, or defaults if it is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fallback_alignment.is_power_of_two() {
            return Err(HcrtError::Config(format!(
                "fallback_alignment must be a power of two, got {}",
                self.fallback_alignment
            )));
        }
        Ok(())
    }
}

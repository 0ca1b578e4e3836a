//! Options shared by the store, the resource manager and authorization

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use driftguard_core::{DiffRenderer, MaskOptions};

use crate::error::{KubeError, Result};

/// Field manager name for Server-Side Apply
pub const DEFAULT_FIELD_MANAGER: &str = "driftguard";

/// Default bound on every store call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource manager options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerOptions {
    /// Field manager used for dry-run applies
    pub field_manager: String,

    /// Bound on each namespace lookup, fetch and dry-run
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Take ownership of fields managed by others
    pub force: bool,

    /// Context lines around each change in rendered diffs
    pub context_lines: usize,

    /// Secret masks
    pub masks: MaskOptions,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            force: true,
            context_lines: 3,
            masks: MaskOptions::default(),
        }
    }
}

impl ManagerOptions {
    /// Parse and validate options from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let options: Self = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject options no store call could work with
    pub fn validate(&self) -> Result<()> {
        if self.field_manager.trim().is_empty() {
            return Err(KubeError::InvalidConfig(
                "fieldManager must not be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(KubeError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.masks.length == 0 {
            return Err(KubeError::InvalidConfig(
                "masks.length must be greater than zero".to_string(),
            ));
        }
        let MaskOptions {
            shared,
            existing,
            projection,
            ..
        } = self.masks;
        if shared == existing || shared == projection || existing == projection {
            return Err(KubeError::InvalidConfig(
                "masks.shared, masks.existing and masks.projection must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Diff renderer configured from these options
    pub fn renderer(&self) -> DiffRenderer {
        DiffRenderer::new()
            .with_context(self.context_lines)
            .with_masks(self.masks.clone())
    }
}

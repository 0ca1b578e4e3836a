//! Configuration loading
//!
//! Options come from `--config` when given, else from
//! `~/.config/driftguard/config.yaml` when it exists, else defaults.

use std::path::{Path, PathBuf};

use driftguard_kube::{KubeError, ManagerOptions};

use crate::error::{CliError, Result};

/// Get default configuration path
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("driftguard").join("config.yaml"))
}

/// Load manager options
pub fn load(explicit: Option<&Path>) -> Result<ManagerOptions> {
    match explicit {
        Some(path) => load_from(path),
        None => match default_path() {
            Some(path) if path.exists() => load_from(&path),
            _ => Ok(ManagerOptions::default()),
        },
    }
}

fn load_from(path: &Path) -> Result<ManagerOptions> {
    ManagerOptions::load_from(path).map_err(|err| match err {
        KubeError::Io(io) => CliError::Io {
            message: format!("{}: {}", path.display(), io),
        },
        other => CliError::input_with_help(
            format!("{}: {}", path.display(), other),
            "see `fieldManager`, `timeout`, `force`, `contextLines` and `masks`",
        ),
    })
}

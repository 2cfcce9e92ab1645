// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{KernelConfig, RawKernelConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawKernelConfig`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for a
/// checked [`KernelConfig`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawKernelConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawKernelConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<KernelConfig> {
    let raw_config = load_from_path(&path)?;
    let config = KernelConfig::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
///
/// Any other problem (unreadable file, bad TOML, failed validation) is
/// still an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<KernelConfig> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return KernelConfig::try_from(RawKernelConfig::default());
    }
    load_and_validate(path)
}

/// `Ckernel.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Ckernel.toml")
}

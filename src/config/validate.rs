// src/config/validate.rs

use crate::config::model::{KernelConfig, RawKernelConfig};
use crate::errors::{KernelError, Result};

impl TryFrom<RawKernelConfig> for KernelConfig {
    type Error = KernelError;

    fn try_from(raw: RawKernelConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(KernelConfig::new_unchecked(
            raw.toolchain,
            raw.workspace,
            raw.verification,
        ))
    }
}

fn validate_raw_config(cfg: &RawKernelConfig) -> Result<()> {
    validate_toolchain(cfg)?;
    validate_workspace(cfg)?;
    validate_verification(cfg)?;
    Ok(())
}

fn validate_toolchain(cfg: &RawKernelConfig) -> Result<()> {
    if cfg.toolchain.compiler.trim().is_empty() {
        return Err(KernelError::Config(
            "[toolchain].compiler must not be empty".to_string(),
        ));
    }

    if let Some(flag) = cfg.toolchain.baseline_flags.iter().find(|f| f.trim().is_empty()) {
        return Err(KernelError::Config(format!(
            "[toolchain].baseline_flags contains an empty flag ({flag:?})"
        )));
    }

    Ok(())
}

fn validate_workspace(cfg: &RawKernelConfig) -> Result<()> {
    if let Some(dir) = &cfg.workspace.temp_dir {
        if !dir.is_dir() {
            return Err(KernelError::Config(format!(
                "[workspace].temp_dir '{}' is not an existing directory",
                dir.display()
            )));
        }
    }
    Ok(())
}

fn validate_verification(cfg: &RawKernelConfig) -> Result<()> {
    if cfg.verification.script_mode > 0o7777 {
        return Err(KernelError::Config(format!(
            "[verification].script_mode must be a permission mode <= 0o7777 (got {:#o})",
            cfg.verification.script_mode
        )));
    }
    Ok(())
}

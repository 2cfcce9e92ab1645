#![allow(dead_code)]

use std::path::PathBuf;

use ckernel::config::{KernelConfig, RawKernelConfig};

/// Builder for `KernelConfig` to simplify test setup.
pub struct KernelConfigBuilder {
    config: RawKernelConfig,
}

impl KernelConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawKernelConfig::default(),
        }
    }

    pub fn compiler(mut self, compiler: &str) -> Self {
        self.config.toolchain.compiler = compiler.to_string();
        self
    }

    pub fn baseline_flags(mut self, flags: &[&str]) -> Self {
        self.config.toolchain.baseline_flags = flags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace.temp_dir = Some(dir.into());
        self
    }

    pub fn interpreter(mut self, interpreter: &str) -> Self {
        self.config.verification.interpreter = interpreter.to_string();
        self
    }

    pub fn script_mode(mut self, mode: u32) -> Self {
        self.config.verification.script_mode = mode;
        self
    }

    pub fn build(self) -> KernelConfig {
        KernelConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for KernelConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

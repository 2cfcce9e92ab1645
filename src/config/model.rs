// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Hardening and sanitizer flags every compilation starts with.
pub const DEFAULT_BASELINE_FLAGS: &[&str] = &[
    "-ggdb",
    "-fPIC",
    "-ftrapv",
    "-fpack-struct",
    "-fsanitize=address",
    "-fsanitize=leak",
    "-fsanitize=undefined",
    "-fsanitize=shift",
    "-fsanitize=vla-bound",
    "-fsanitize=null",
    "-fsanitize=bounds",
    "-fsanitize=object-size",
    "-fsanitize-address-use-after-scope",
    "-fstack-protector-all",
];

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [toolchain]
/// compiler = "gcc"
/// baseline_flags = ["-ggdb", "-fsanitize=address"]
///
/// [workspace]
/// temp_dir = "/tmp/ckernel"
///
/// [verification]
/// interpreter = "/bin/bash"
/// script_mode = 511
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawKernelConfig {
    #[serde(default)]
    pub toolchain: ToolchainSection,

    #[serde(default)]
    pub workspace: WorkspaceSection,

    #[serde(default)]
    pub verification: VerificationSection,
}

/// `[toolchain]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainSection {
    /// Compiler executable, looked up on `PATH` if not absolute.
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Flags placed before any `cflags` directive.
    #[serde(default = "default_baseline_flags")]
    pub baseline_flags: Vec<String>,
}

fn default_compiler() -> String {
    "gcc".to_string()
}

fn default_baseline_flags() -> Vec<String> {
    DEFAULT_BASELINE_FLAGS.iter().map(|s| s.to_string()).collect()
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            baseline_flags: default_baseline_flags(),
        }
    }
}

/// `[workspace]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSection {
    /// Directory for source files and binaries; the system temp directory
    /// when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

/// `[verification]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationSection {
    /// Program that runs each test script. An empty string runs the
    /// script directly.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Permission bits applied to a test script before it runs.
    #[serde(default = "default_script_mode")]
    pub script_mode: u32,
}

fn default_interpreter() -> String {
    "/bin/bash".to_string()
}

fn default_script_mode() -> u32 {
    0o777
}

impl Default for VerificationSection {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script_mode: default_script_mode(),
        }
    }
}

impl VerificationSection {
    pub fn interpreter(&self) -> Option<&str> {
        let trimmed = self.interpreter.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Validated configuration used by the rest of the crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelConfig {
    pub toolchain: ToolchainSection,
    pub workspace: WorkspaceSection,
    pub verification: VerificationSection,
}

impl KernelConfig {
    /// Build without validation. Use `KernelConfig::try_from` on a
    /// [`RawKernelConfig`] for checked construction.
    pub(crate) fn new_unchecked(
        toolchain: ToolchainSection,
        workspace: WorkspaceSection,
        verification: VerificationSection,
    ) -> Self {
        Self {
            toolchain,
            workspace,
            verification,
        }
    }

    /// Directory temp files are created in.
    pub fn temp_dir(&self) -> PathBuf {
        self.workspace
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

// src/config/mod.rs

//! Toolchain configuration: compiler, baseline flags, where temp files go,
//! and how test scripts are run.
//!
//! - [`model`] holds the TOML data model.
//! - [`loader`] reads and validates files.
//! - [`validate`] turns a raw file into a checked [`KernelConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    KernelConfig, RawKernelConfig, ToolchainSection, VerificationSection, WorkspaceSection,
    DEFAULT_BASELINE_FLAGS,
};

// src/errors.rs

//! Crate-wide error type.
//!
//! Only *backend* failures live here: a process that could not be started,
//! output that is not valid UTF-8, or a temp file that could not be created
//! or removed. A user's program that fails to compile, crashes or exits
//! nonzero is reported as text on the error sink and never becomes a
//! `KernelError`.

use thiserror::Error;

use crate::types::StreamKind;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stream} of child process is not valid UTF-8: {source}")]
    Decode {
        stream: StreamKind,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, KernelError>;

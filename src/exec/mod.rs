// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] holds [`ProcessSupervisor`], which spawns one child with
//!   piped stdin/stdout/stderr and streams its output while it runs.
//! - [`decode`] turns raw output chunks into text, strictly.
//! - [`sink`] defines [`OutputSink`], the host-side receiver of that text.

pub mod decode;
pub mod process;
pub mod sink;

pub use process::ProcessSupervisor;
pub use sink::{ConsoleSink, OutputSink};

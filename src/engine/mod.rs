// src/engine/mod.rs

//! Execution engine.
//!
//! - [`pipeline`] runs one request through compile, run and verification
//!   stages, one child process at a time.
//! - [`session`] is the object a host drives: it owns the temp files of
//!   all requests and exposes `execute` / `shutdown`.
//!
//! A failing user program never makes these return an error. Compiler
//! errors, crashes and failing test scripts are reported as text on the
//! error sink; only spawn, decode and temp-file failures propagate.

use std::fmt;
use std::path::PathBuf;

use crate::types::ExitCode;

pub mod pipeline;
pub mod session;

pub use pipeline::{compile_args, ExecutionPipeline};
pub use session::Session;

/// Stage of an [`ExecutionPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compiling,
    Running,
    /// Running the test script at this index.
    Verifying(usize),
    Done,
    /// Compilation failed; nothing further runs.
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Compiling => f.write_str("compiling"),
            Stage::Running => f.write_str("running"),
            Stage::Verifying(i) => write!(f, "verifying[{i}]"),
            Stage::Done => f.write_str("done"),
            Stage::Aborted => f.write_str("aborted"),
        }
    }
}

/// What the host is told about a request.
///
/// Always `Handled` when no backend error occurred, whatever the user's
/// program did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Handled,
}

/// Exit codes observed while running one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub final_stage: Stage,
    pub compile_exit: ExitCode,
    /// `None` when the program never ran.
    pub run_exit: Option<ExitCode>,
    /// One entry per test script, in order.
    pub script_exits: Vec<ExitCode>,
    /// Compiled binary, when compilation succeeded.
    pub binary: Option<PathBuf>,
}

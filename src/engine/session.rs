// src/engine/session.rs

use tracing::{debug, info, warn};

use crate::config::KernelConfig;
use crate::directive;
use crate::errors::Result;
use crate::exec::OutputSink;
use crate::fs::TempFileTracker;

use super::{ExecutionPipeline, ExecutionStatus, PipelineReport};

/// Host-facing entry point: one per interactive session.
///
/// Each [`execute`](Self::execute) call runs one source text to completion.
/// Temp files accumulate over the session and are removed by
/// [`shutdown`](Self::shutdown), or when the session is dropped.
#[derive(Debug)]
pub struct Session {
    config: KernelConfig,
    files: TempFileTracker,
    execution_count: u64,
}

impl Session {
    pub fn new(config: KernelConfig) -> Self {
        let files = TempFileTracker::new(Some(config.temp_dir()));
        Self {
            config,
            files,
            execution_count: 0,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Number of `execute` calls so far.
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    pub fn tracked_files(&self) -> &TempFileTracker {
        &self.files
    }

    /// Compile and run `source`, streaming all output to `sink`.
    ///
    /// Returns [`ExecutionStatus::Handled`] unless the backend itself
    /// failed.
    pub async fn execute(
        &mut self,
        source: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<ExecutionStatus> {
        self.run(source, sink).await.map(|_| ExecutionStatus::Handled)
    }

    /// Like [`execute`](Self::execute), but also returns the exit codes of
    /// each stage.
    pub async fn run(
        &mut self,
        source: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<PipelineReport> {
        self.execution_count += 1;
        let directives = directive::parse(source);
        debug!(execution = self.execution_count, ?directives, "parsed directives");

        let report = ExecutionPipeline::new(&self.config)
            .run(source, &directives, &mut self.files, sink)
            .await?;

        info!(
            execution = self.execution_count,
            stage = %report.final_stage,
            compile_exit = report.compile_exit,
            run_exit = ?report.run_exit,
            script_exits = ?report.script_exits,
            "request handled"
        );
        Ok(report)
    }

    /// Remove every temp file created during the session.
    pub fn shutdown(&mut self) -> Result<()> {
        let count = self.files.len();
        match self.files.cleanup() {
            Ok(()) => {
                info!(files = count, "session shut down");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "session shut down with cleanup errors");
                Err(e)
            }
        }
    }
}

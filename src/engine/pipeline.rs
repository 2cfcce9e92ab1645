// src/engine/pipeline.rs

use std::path::Path;

use tracing::{debug, info};

use crate::config::KernelConfig;
use crate::directive::Directives;
use crate::errors::Result;
use crate::exec::{OutputSink, ProcessSupervisor};
use crate::fs::{set_mode, TempFileTracker};
use crate::types::ExitCode;

use super::{PipelineReport, Stage};

/// Build the compiler argument list.
///
/// Order: baseline flags, `cflags`, source, `-o binary`, `ldflags`. Link
/// flags come last so libraries follow the objects that need them.
pub fn compile_args(
    config: &KernelConfig,
    directives: &Directives,
    source: &Path,
    binary: &Path,
) -> Vec<String> {
    let mut args = Vec::with_capacity(
        config.toolchain.baseline_flags.len()
            + directives.compile_flags.len()
            + directives.link_flags.len()
            + 3,
    );
    args.extend(config.toolchain.baseline_flags.iter().cloned());
    args.extend(directives.compile_flags.iter().cloned());
    args.push(path_arg(source));
    args.push("-o".to_string());
    args.push(path_arg(binary));
    args.extend(directives.link_flags.iter().cloned());
    args
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Runs one request: compile, run, then each test script.
///
/// Stages run strictly one after another; at most one child process is
/// alive at a time.
#[derive(Debug)]
pub struct ExecutionPipeline<'a> {
    config: &'a KernelConfig,
    stage: Stage,
}

impl<'a> ExecutionPipeline<'a> {
    pub fn new(config: &'a KernelConfig) -> Self {
        Self {
            config,
            stage: Stage::Compiling,
        }
    }

    /// Run `source` through every stage, streaming output to `sink`.
    ///
    /// Source and binary are created through `files` and stay there for
    /// the session to clean up.
    pub async fn run(
        mut self,
        source: &str,
        directives: &Directives,
        files: &mut TempFileTracker,
        sink: &mut dyn OutputSink,
    ) -> Result<PipelineReport> {
        let source_path = files.create(".c", source.as_bytes())?;
        let binary_path = files.create(".out", b"")?;

        let compile_exit = self
            .compile(directives, &source_path, &binary_path, sink)
            .await?;

        let mut report = PipelineReport {
            final_stage: Stage::Compiling,
            compile_exit,
            run_exit: None,
            script_exits: Vec::new(),
            binary: None,
        };

        if compile_exit != 0 {
            sink.write_stderr(&format!(
                "[ckernel] temporary files are kept in {}\n",
                files.dir().display()
            ));
            sink.write_stderr(&format!(
                "[ckernel] compiler exited with code {compile_exit}, the executable will not be executed\n"
            ));
            self.transition(Stage::Aborted);
            report.final_stage = self.stage;
            return Ok(report);
        }
        report.binary = Some(binary_path.clone());

        self.transition(Stage::Running);
        report.run_exit = Some(self.execute(directives, &binary_path, sink).await?);

        for (index, script) in directives.test_scripts.iter().enumerate() {
            self.transition(Stage::Verifying(index));
            let code = self.verify(script, &binary_path, sink).await?;
            report.script_exits.push(code);
        }

        self.transition(Stage::Done);
        report.final_stage = self.stage;
        Ok(report)
    }

    fn transition(&mut self, next: Stage) {
        info!(from = %self.stage, to = %next, "pipeline stage transition");
        self.stage = next;
    }

    async fn compile(
        &mut self,
        directives: &Directives,
        source: &Path,
        binary: &Path,
        sink: &mut dyn OutputSink,
    ) -> Result<ExitCode> {
        let args = compile_args(self.config, directives, source, binary);
        let mut process = ProcessSupervisor::spawn(&self.config.toolchain.compiler, &args)?;
        process.close_input();
        process.wait(sink).await
    }

    async fn execute(
        &mut self,
        directives: &Directives,
        binary: &Path,
        sink: &mut dyn OutputSink,
    ) -> Result<ExitCode> {
        emit_guidance(directives, sink);

        let mut process = ProcessSupervisor::spawn(&path_arg(binary), &directives.program_args)?;
        process.write_input(directives.stdin.as_bytes()).await?;
        process.close_input();
        let code = process.wait(sink).await?;

        if code != 0 {
            sink.write_stderr(&format!("[ckernel] executable exited with code {code}\n"));
        }
        Ok(code)
    }

    async fn verify(
        &mut self,
        script: &str,
        binary: &Path,
        sink: &mut dyn OutputSink,
    ) -> Result<ExitCode> {
        let script = script.trim();
        sink.write_stderr(&format!("Testing with script: {script}.\n"));

        let mode = self.config.verification.script_mode;
        if let Err(e) = set_mode(Path::new(script), mode) {
            debug!(script, error = %e, "could not change script mode");
            sink.write_stderr(&format!(
                "[ckernel] could not make {script} executable: {e}\n"
            ));
        }

        let mut argv: Vec<String> = Vec::with_capacity(3);
        if let Some(interpreter) = self.config.verification.interpreter() {
            argv.push(interpreter.to_string());
        }
        argv.push(script.to_string());
        argv.push(path_arg(binary));
        sink.write_stderr(&format!("Command: {argv:?}\n"));

        let (program, args) = argv.split_at(1);
        let mut process = ProcessSupervisor::spawn(&program[0], args)?;
        process.close_input();
        let code = process.wait(sink).await?;

        if code != 0 {
            sink.write_stderr(&format!(
                "[ckernel] test script {script} exited with code {code}\n"
            ));
        }
        Ok(code)
    }
}

/// Echo configured input, expected output and memory hints before the
/// program runs. Nothing is checked against them.
fn emit_guidance(directives: &Directives, sink: &mut dyn OutputSink) {
    if !directives.stdin.is_empty() {
        sink.write_stderr(&format!("input: {}", directives.stdin));
    }
    if !directives.expected_stdout.is_empty() {
        sink.write_stderr(&format!("expected output: {}", directives.expected_stdout));
    }
    if !directives.memory_hints.is_empty() {
        sink.write_stderr("Some memory hints which you might like to verify for this question:\n");
        for hint in directives.memory_hints.iter() {
            sink.write_stderr(hint);
        }
    }
}

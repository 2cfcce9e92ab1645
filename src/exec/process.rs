// src/exec/process.rs

//! A child process whose output can be observed while it runs.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::errors::{KernelError, Result};
use crate::exec::decode::StreamDecoder;
use crate::exec::sink::OutputSink;
use crate::types::{ExitCode, StreamKind};

/// Size of a single read from a child's output pipe.
pub const CHUNK_SIZE: usize = 4096;

/// How long [`ProcessSupervisor::wait`] keeps listening to open pipes
/// after the child has exited, counted from the last chunk received.
pub const EXIT_IDLE_GRACE: Duration = Duration::from_millis(200);

/// Queue of raw chunks for one output stream.
///
/// The drain task is the only sender, the owning supervisor the only
/// receiver.
struct StreamQueue {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    drain: Option<JoinHandle<()>>,
    decoder: StreamDecoder,
    truncated: bool,
}

impl StreamQueue {
    fn start<R>(stream: StreamKind, reader: R, activity: Arc<Notify>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let drain = spawn_drain(stream, reader, tx, activity);
        Self {
            rx,
            drain: Some(drain),
            decoder: StreamDecoder::new(stream),
            truncated: false,
        }
    }

    /// Dequeue the chunks queued at the time of the call and decode them.
    ///
    /// Chunks that arrive during the call are left for the next one.
    fn take_available(&mut self) -> Result<String> {
        let available = self.rx.len();
        let mut bytes = Vec::new();
        for _ in 0..available {
            match self.rx.try_recv() {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(_) => break,
            }
        }
        if bytes.is_empty() {
            return Ok(String::new());
        }
        self.decoder.decode(&bytes)
    }

    /// Whether the drain task has reached end-of-stream and been reaped.
    fn drained(&self) -> bool {
        self.drain.is_none()
    }

    /// Reap the drain task once it reaches end-of-stream. Never resolves
    /// if it was already reaped.
    async fn settle(&mut self, program: &str) {
        let Some(handle) = self.drain.as_mut() else {
            return std::future::pending().await;
        };
        if let Err(e) = handle.await {
            warn!(program, error = %e, "drain task did not finish cleanly");
        }
        self.drain = None;
    }

    /// Stop a drain task that is still reading.
    fn abandon(&mut self) {
        if let Some(handle) = self.drain.take() {
            handle.abort();
            self.truncated = true;
        }
    }

    /// Check for a truncated character at end-of-stream.
    ///
    /// Skipped when the stream was abandoned while still open.
    fn finish(&mut self) -> Result<()> {
        if self.truncated {
            return Ok(());
        }
        self.decoder.finish()
    }
}

/// Move chunks from `reader` into `tx` until end-of-stream.
fn spawn_drain<R>(
    stream: StreamKind,
    mut reader: R,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    activity: Arc<Notify>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        debug!(%stream, "receiver dropped; stopping drain");
                        break;
                    }
                    activity.notify_one();
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(%stream, error = %e, "error reading child output; stopping drain");
                    break;
                }
            }
        }
        activity.notify_one();
        debug!(%stream, "drain task reached end of stream");
    })
}

/// Supervises one child process wired to three pipes.
///
/// Output is read continuously by two background drain tasks, so neither
/// pipe can fill up and stall the child. [`flush`](Self::flush) hands
/// whatever has been read so far to an [`OutputSink`] without blocking;
/// [`wait`](Self::wait) keeps flushing until the child exits.
pub struct ProcessSupervisor {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: StreamQueue,
    stderr: StreamQueue,
    activity: Arc<Notify>,
    exit_code: Option<ExitCode>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Start `program` with `args` and begin draining its output.
    ///
    /// Arguments are passed as-is, without a shell. Must be called from
    /// within a Tokio runtime.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| KernelError::Spawn {
            program: program.to_string(),
            source,
        })?;

        info!(program, ?args, pid = child.id(), "spawned child process");

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => {
                return Err(KernelError::Resource(format!(
                    "pipes for '{program}' were not created"
                )));
            }
        };

        let activity = Arc::new(Notify::new());
        let stdout = StreamQueue::start(StreamKind::Stdout, stdout, Arc::clone(&activity));
        let stderr = StreamQueue::start(StreamKind::Stderr, stderr, Arc::clone(&activity));

        Ok(Self {
            program: program.to_string(),
            child,
            stdin: Some(stdin),
            stdout,
            stderr,
            activity,
            exit_code: None,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Write `bytes` to the child's standard input.
    ///
    /// A child that exits or closes its input before reading everything is
    /// the program's business, not a backend failure, so a broken pipe is
    /// logged and otherwise ignored.
    pub async fn write_input(&mut self, bytes: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            KernelError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "standard input already closed",
            ))
        })?;

        if bytes.is_empty() {
            return Ok(());
        }

        let written = async {
            stdin.write_all(bytes).await?;
            stdin.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(program = %self.program, "child closed its input before reading all of it");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Signal end-of-input to the child. Later calls do nothing.
    pub fn close_input(&mut self) {
        if self.stdin.take().is_some() {
            debug!(program = %self.program, "closed child standard input");
        }
    }

    /// Deliver everything queued so far to `sink`, without waiting.
    ///
    /// Stdout is delivered before stderr. Nothing is written for a stream
    /// with no new text.
    pub fn flush(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        let out = self.stdout.take_available()?;
        if !out.is_empty() {
            debug!(program = %self.program, bytes = out.len(), "flushing stdout");
            sink.write_stdout(&out);
        }

        let err = self.stderr.take_available()?;
        if !err.is_empty() {
            debug!(program = %self.program, bytes = err.len(), "flushing stderr");
            sink.write_stderr(&err);
        }

        Ok(())
    }

    /// Check, without blocking, whether the child has exited.
    pub fn poll(&mut self) -> Result<Option<ExitCode>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        match self.child.try_wait()? {
            Some(status) => Ok(Some(self.record_exit(status))),
            None => Ok(None),
        }
    }

    /// Stream output to `sink` until the child exits, and return its exit
    /// code.
    ///
    /// Between flushes the call sleeps until either new output is queued
    /// or the child exits. After exit, output keeps streaming until both
    /// pipes reach end-of-stream, or until no new output has arrived for
    /// [`EXIT_IDLE_GRACE`]. The second case covers background processes
    /// that inherited the pipes; whatever they write later is dropped.
    pub async fn wait(&mut self, sink: &mut dyn OutputSink) -> Result<ExitCode> {
        let activity = Arc::clone(&self.activity);

        let code = loop {
            self.flush(sink)?;
            if let Some(code) = self.poll()? {
                break code;
            }

            let exited = tokio::select! {
                _ = activity.notified() => None,
                status = self.child.wait() => Some(status),
            };
            if let Some(status) = exited {
                self.record_exit(status?);
            }
        };

        loop {
            self.flush(sink)?;
            if self.stdout.drained() && self.stderr.drained() {
                break;
            }
            let idle = tokio::select! {
                _ = activity.notified() => false,
                _ = self.stdout.settle(&self.program) => false,
                _ = self.stderr.settle(&self.program) => false,
                _ = sleep(EXIT_IDLE_GRACE) => true,
            };
            if idle {
                debug!(
                    program = %self.program,
                    "output pipes idle after exit; leaving them to background processes"
                );
                self.stdout.abandon();
                self.stderr.abandon();
                break;
            }
        }

        self.flush(sink)?;
        self.stdout.finish()?;
        self.stderr.finish()?;

        Ok(code)
    }

    fn record_exit(&mut self, status: ExitStatus) -> ExitCode {
        if let Some(code) = self.exit_code {
            return code;
        }
        let code = exit_code_of(status);
        info!(program = %self.program, exit_code = code, "child process exited");
        self.exit_code = Some(code);
        code
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        for handle in [self.stdout.drain.take(), self.stderr.drain.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> ExitCode {
    status.code().unwrap_or(-1)
}

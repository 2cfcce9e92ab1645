// src/exec/sink.rs

//! Where decoded process output goes.

use std::io::Write;

use tracing::warn;

/// Receiver of decoded output text, implemented by the host.
///
/// Each call carries what a single flush collected for that stream. Calls
/// are fire-and-forget: the sink reports nothing back.
pub trait OutputSink: Send {
    fn write_stdout(&mut self, text: &str);
    fn write_stderr(&mut self, text: &str);
}

/// Sink that forwards text to this process's own stdout / stderr.
///
/// Used by the command-line host.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn write_stdout(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            warn!(error = %e, "failed to write to stdout");
        }
    }

    fn write_stderr(&mut self, text: &str) {
        let mut err = std::io::stderr().lock();
        if let Err(e) = err.write_all(text.as_bytes()).and_then(|_| err.flush()) {
            warn!(error = %e, "failed to write to stderr");
        }
    }
}

use ckernel::exec::OutputSink;
use ckernel::types::StreamKind;

/// Sink that records every write, in order, with its stream.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<(StreamKind, String)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(StreamKind, String)] {
        &self.events
    }

    /// Everything written to stdout, concatenated.
    pub fn stdout(&self) -> String {
        self.collect(StreamKind::Stdout)
    }

    /// Everything written to stderr, concatenated.
    pub fn stderr(&self) -> String {
        self.collect(StreamKind::Stderr)
    }

    /// Number of individual writes to `stream`.
    pub fn writes_to(&self, stream: StreamKind) -> usize {
        self.events.iter().filter(|(s, _)| *s == stream).count()
    }

    fn collect(&self, stream: StreamKind) -> String {
        self.events
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn write_stdout(&mut self, text: &str) {
        self.events.push((StreamKind::Stdout, text.to_string()));
    }

    fn write_stderr(&mut self, text: &str) {
        self.events.push((StreamKind::Stderr, text.to_string()));
    }
}

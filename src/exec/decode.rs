// src/exec/decode.rs

//! Strict, incremental UTF-8 decoding of captured output.

use crate::errors::{KernelError, Result};
use crate::types::StreamKind;

/// Decodes the bytes of one stream across successive flushes.
///
/// Chunk boundaries are arbitrary, so a multi-byte character may arrive
/// split over two flushes. The incomplete tail is held back until the rest
/// arrives. Invalid sequences are an error immediately; an incomplete tail
/// is an error only once the stream has ended.
#[derive(Debug)]
pub struct StreamDecoder {
    stream: StreamKind,
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new(stream: StreamKind) -> Self {
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    /// Decode `bytes` (prefixed by any held-back tail).
    ///
    /// Returns the longest complete prefix as text; may be empty.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<String> {
        self.pending.extend_from_slice(bytes);

        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(err) if err.error_len().is_none() => {
                let valid = err.valid_up_to();
                let tail = self.pending.split_off(valid);
                let text = String::from_utf8(std::mem::replace(&mut self.pending, tail))
                    .map_err(|e| self.error(e.utf8_error()))?;
                Ok(text)
            }
            Err(err) => {
                self.pending.clear();
                Err(self.error(err))
            }
        }
    }

    /// Fail if the stream ended in the middle of a character.
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let leftover = std::mem::take(&mut self.pending);
        match std::str::from_utf8(&leftover) {
            Ok(_) => Ok(()),
            Err(err) => Err(self.error(err)),
        }
    }

    fn error(&self, source: std::str::Utf8Error) -> KernelError {
        KernelError::Decode {
            stream: self.stream,
            source,
        }
    }
}

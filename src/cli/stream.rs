//! Chunk-tolerant parser for the agent's stdout stream.
//!
//! Child output arrives in arbitrary byte chunks that do not respect line
//! boundaries. The parser keeps one pending-partial-line buffer per instance,
//! so the event sequence it produces is invariant under re-chunking of the
//! same byte stream.

use crate::cli::AgentEvent;

/// Error type for stream parsing operations.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// A line failed JSON decoding.
    #[error("Failed to parse line {input:?}: {reason}")]
    ParseError {
        /// The offending line.
        input: String,
        /// Decoder message.
        reason: String,
    },
}

/// Incremental line reassembler and event decoder.
#[derive(Debug, Default)]
pub struct StreamParser {
    pending: String,
}

impl StreamParser {
    /// Create a parser with an empty pending buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single complete line into an event.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::ParseError` if the line is not valid JSON or
    /// does not match the event shape at all.
    pub fn parse_line(line: &str) -> Result<AgentEvent, StreamError> {
        serde_json::from_str(line).map_err(|e| StreamError::ParseError {
            input: line.to_string(),
            reason: e.to_string(),
        })
    }

    /// Feed one chunk of raw child output.
    ///
    /// Every complete line in the buffer is decoded; blank lines and lines
    /// that fail decoding are dropped. The trailing partial line (if any) is
    /// retained for the next chunk.
    pub fn push(&mut self, chunk: &str) -> Vec<AgentEvent> {
        self.pending.push_str(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            if let Some(event) = Self::decode(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Feed one chunk of raw bytes, decoding lossily as UTF-8.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<AgentEvent> {
        self.push(&String::from_utf8_lossy(chunk))
    }

    /// Flush the pending buffer on stream close.
    ///
    /// A final line without a trailing newline is still a parse attempt.
    pub fn finish(&mut self) -> Option<AgentEvent> {
        let tail = std::mem::take(&mut self.pending);
        Self::decode(&tail)
    }

    fn decode(line: &str) -> Option<AgentEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match Self::parse_line(trimmed) {
            Ok(event) => Some(event),
            Err(e) => {
                // Malformed lines are never fatal; nothing partial reaches
                // the interpreter.
                tracing::trace!(error = %e, "Dropped undecodable line");
                None
            }
        }
    }
}

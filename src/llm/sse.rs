// src/llm/sse.rs
// Incremental server-sent-event decoding shared by the relay and the consumer

use tracing::debug;

use super::types::CompletionChunk;
use crate::error::{RelayError, Result};

/// Prefix of every SSE data line
pub const DATA_PREFIX: &str = "data:";

/// Terminal payload used by OpenAI-compatible APIs
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest line held back while waiting for its `\n`
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into text lines.
///
/// Bytes are buffered until a `\n` arrives, so a multi-byte UTF-8 sequence
/// split across chunk boundaries is decoded only once it is complete. `\n`
/// never occurs inside a multi-byte sequence, so splitting on the raw byte is
/// safe. Invalid sequences in a completed line become U+FFFD.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no `\n`
    scanned: usize,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed (without terminators).
    ///
    /// Fails with `StreamDecode` once an unterminated line exceeds
    /// `MAX_LINE_BYTES`; the buffered bytes are discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.pending[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
            from = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();

        if self.pending.len() > MAX_LINE_BYTES {
            let held = self.pending.len();
            self.pending.clear();
            self.scanned = 0;
            return Err(RelayError::StreamDecode(format!(
                "line exceeds {} bytes without a newline ({} buffered)",
                MAX_LINE_BYTES, held
            )));
        }
        Ok(lines)
    }

    /// Flush a final line that never got its newline
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        self.scanned = 0;
        Some(line)
    }

    /// Bytes held back waiting for the rest of a line
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Payload of a `data:` line, if it is one
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim_start)
}

/// Meaning of one line from the upstream completion stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamLine {
    /// Non-empty incremental text
    Delta(String),
    /// `[DONE]` sentinel
    Done,
    /// Blank, comment, non-data field, or a chunk without text (role, finish_reason)
    Empty,
    /// Error object embedded in the stream, with its status when it carries one
    Error { status: Option<u16>, message: String },
    /// Unparseable payload; skipped by the relay
    Malformed(String),
}

/// Classify one upstream SSE line
pub fn parse_upstream_line(line: &str) -> UpstreamLine {
    let Some(payload) = data_payload(line.trim_end()) else {
        return UpstreamLine::Empty;
    };
    if payload.is_empty() {
        return UpstreamLine::Empty;
    }
    if payload == DONE_SENTINEL {
        return UpstreamLine::Done;
    }

    let chunk: CompletionChunk = match serde_json::from_str(payload) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Skipping malformed upstream line");
            return UpstreamLine::Malformed(e.to_string());
        }
    };

    if let Some(err) = chunk.error {
        let status = err.status();
        let message = if err.message.is_empty() {
            "upstream reported an error".to_string()
        } else {
            err.message
        };
        return UpstreamLine::Error { status, message };
    }

    match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(content) if !content.is_empty() => UpstreamLine::Delta(content),
        _ => UpstreamLine::Empty,
    }
}

/// Groups decoded lines into blank-line-delimited SSE frames.
///
/// Multiple `data:` lines in one frame are joined with `\n`; comment lines
/// (keep-alives) and other fields are ignored.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    lines: SseLineDecoder,
    data: Vec<String>,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the data payload of every completed frame
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        let mut frames = Vec::new();
        for line in self.lines.push(chunk)? {
            self.accept_line(&line, &mut frames);
        }
        Ok(frames)
    }

    /// Flush whatever frame was still open at end of body
    pub fn finish(&mut self) -> Option<String> {
        if let Some(line) = self.lines.finish() {
            let mut frames = Vec::new();
            self.accept_line(&line, &mut frames);
            if let Some(frame) = frames.pop() {
                return Some(frame);
            }
        }
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data).join("\n"))
        }
    }

    fn accept_line(&mut self, line: &str, frames: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                frames.push(std::mem::take(&mut self.data).join("\n"));
            }
        } else if let Some(payload) = data_payload(line) {
            self.data.push(payload.to_string());
        }
    }
}

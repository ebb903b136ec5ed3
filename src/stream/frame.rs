//! JSON Lines framing: one JSON value per `\n`-terminated line.

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::utf8::Utf8Decoder;

/// Longest slice of a bad line kept in error messages.
const MAX_ERROR_LINE: usize = 120;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame `{line}`: {source}")] Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode frame: {0}")] Encode(#[source] serde_json::Error),
}

/// What the consumer does with a line that is not valid JSON for the expected type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FramePolicy {
    /// Surface the error and stop reading the stream.
    #[default]
    Strict,
    /// Log the bad frame, skip it and keep reading.
    Tolerant,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseFramePolicyError {
    message: String,
}

impl fmt::Display for ParseFramePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseFramePolicyError {}

impl FromStr for FramePolicy {
    type Err = ParseFramePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(FramePolicy::Strict),
            "tolerant" => Ok(FramePolicy::Tolerant),
            _ =>
                Err(ParseFramePolicyError {
                    message: format!("Invalid frame policy: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for FramePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramePolicy::Strict => write!(f, "strict"),
            FramePolicy::Tolerant => write!(f, "tolerant"),
        }
    }
}

/// Serializes `value` as one frame: compact JSON followed by a single `\n`.
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>, FrameError> {
    let mut buf = serde_json::to_vec(value).map_err(FrameError::Encode)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Parses one complete line produced by [`LineBuffer`] or [`FrameDecoder`].
pub fn parse_frame<T: DeserializeOwned>(line: &str) -> Result<T, FrameError> {
    serde_json::from_str(line).map_err(|source| FrameError::Malformed {
        line: truncate(line),
        source,
    })
}

fn truncate(line: &str) -> String {
    match line.char_indices().nth(MAX_ERROR_LINE) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

/// Splits appended text into complete lines and keeps the unterminated remainder.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` and drains every complete line, trimmed. Blank lines are dropped.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        // The retained remainder never holds a newline, so only new text is scanned.
        let mut search_from = self.buf.len();
        self.buf.push_str(text);

        let mut lines = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.buf[search_from..].find('\n') {
            let end = search_from + offset;
            let line = self.buf[line_start..end].trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            line_start = end + 1;
            search_from = line_start;
        }
        self.buf.drain(..line_start);
        lines
    }

    /// Text received after the last newline.
    pub fn remainder(&self) -> &str {
        &self.buf
    }

    pub fn take_remainder(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}

/// Bytes in, complete frame lines out.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8Decoder,
    lines: LineBuffer,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(chunk);
        self.lines.push(&text)
    }

    /// Flushes the decoder at end of stream. Anything left without a
    /// terminating newline is dropped.
    pub fn finish(&mut self) -> Vec<String> {
        let tail = self.utf8.finish();
        let lines = self.lines.push(&tail);

        let residue = self.lines.take_remainder();
        if !residue.trim().is_empty() {
            warn!("Discarding {} bytes of unterminated frame data at end of stream", residue.len());
        }
        lines
    }

    pub fn pending(&self) -> &str {
        self.lines.remainder()
    }
}

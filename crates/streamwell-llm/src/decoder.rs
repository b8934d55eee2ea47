//! Chunk decoder for `data:` framed streams.
//!
//! The wire format is a sequence of lines:
//!
//! ```text
//! data: {"choices":[{"delta":{"reasoning_content":"thinking..."}}]}
//! data: {"choices":[{"delta":{"content":"4"}}]}
//! data: [DONE]
//! ```
//!
//! [`decode`] is pure: it turns one buffer of whole lines into at most one
//! combined [`StreamDelta`]. Buffering partial lines across reads is the
//! caller's job (see [`LineBuffer`]). A newline spelling split over two
//! buffers (`\r` then `\n`, or `\` then `n`) is only recognized when
//! fragments are normalized in order through a [`NewlineCarry`], which is
//! what a streaming reader does with [`decode_raw`].

use streamwell_types::StreamDelta;
use tracing::{trace, warn};

use crate::types::Frame;

/// Prefix of every frame line.
pub const FRAME_PREFIX: &str = "data:";

/// Payload of the end-of-stream line.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Finish reason that marks the last frame.
const FINISH_STOP: &str = "stop";

/// Decode one buffer into zero or one combined delta.
///
/// - blank lines and lines without the `data:` prefix are skipped
/// - `data: [DONE]` marks completion and stops processing the buffer
/// - a frame whose first choice has `finish_reason: "stop"` marks
///   completion; its own text is kept and later lines are ignored
/// - a frame that is not valid JSON is logged and skipped
/// - content and reasoning fragments from several frames are concatenated
///   in arrival order
///
/// A buffer that is not valid UTF-8 yields nothing. Text comes back with
/// newline spellings unified (see [`normalize_newlines`]).
pub fn decode(buffer: &[u8]) -> Vec<StreamDelta> {
    decode_raw(buffer)
        .into_iter()
        .map(|mut delta| {
            delta.content = delta.content.map(|s| normalize_newlines(&s));
            delta.reasoning = delta.reasoning.map(|s| normalize_newlines(&s));
            delta
        })
        .collect()
}

/// [`decode`] without newline normalization; fragments are returned as
/// the provider sent them.
pub fn decode_raw(buffer: &[u8]) -> Vec<StreamDelta> {
    let text = match std::str::from_utf8(buffer) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, bytes = buffer.len(), "stream buffer is not valid utf-8, dropping");
            return Vec::new();
        }
    };

    let mut combined = StreamDelta::default();

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(payload) = line.strip_prefix(FRAME_PREFIX) else {
            trace!(line = %line, "skipping non-data line");
            continue;
        };
        let payload = payload.trim_start();

        if payload == DONE_SENTINEL {
            combined.done = true;
            break;
        }

        let frame: Frame = match serde_json::from_str(payload) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, payload = %payload, "malformed frame, skipping line");
                continue;
            }
        };

        let Some(choice) = frame.choices.into_iter().next() else {
            continue;
        };
        if let Some(delta) = choice.delta {
            if let Some(content) = delta.content.filter(|s| !s.is_empty()) {
                combined
                    .content
                    .get_or_insert_with(String::new)
                    .push_str(&content);
            }
            if let Some(reasoning) = delta.reasoning_content.filter(|s| !s.is_empty()) {
                combined
                    .reasoning
                    .get_or_insert_with(String::new)
                    .push_str(&reasoning);
            }
        }
        if choice.finish_reason.as_deref() == Some(FINISH_STOP) {
            combined.done = true;
            break;
        }
    }

    if combined.is_empty() {
        return Vec::new();
    }
    vec![combined]
}

/// Unify newline spellings to `\n`.
///
/// Handles an escaped `\n` sequence, CR-LF, lone CR, the `↵` glyph, and
/// the Unicode line and paragraph separators.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\r\n", "\n")
        .replace(['\r', '↵', '\u{2028}', '\u{2029}'], "\n")
}

/// Normalizes a fragment stream whose newline spellings may straddle
/// fragment boundaries.
///
/// A trailing `\r` or `\` is held until the next fragment shows whether it
/// starts a two-character spelling.
#[derive(Debug, Default)]
pub struct NewlineCarry {
    held: String,
}

impl NewlineCarry {
    /// Normalize `fragment`, prefixed by whatever was held from the last one.
    pub fn push(&mut self, fragment: &str) -> String {
        let mut text = std::mem::take(&mut self.held);
        text.push_str(fragment);
        if text.ends_with(['\r', '\\']) {
            self.held = text.split_off(text.len() - 1);
        }
        normalize_newlines(&text)
    }

    /// Release the held character, normalized on its own.
    pub fn finish(&mut self) -> String {
        normalize_newlines(&std::mem::take(&mut self.held))
    }
}

/// Accumulates raw bytes and releases only complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes`; return everything up to and including the last
    /// newline, or `None` if no line is complete yet.
    pub fn push(&mut self, bytes: &[u8]) -> Option<Vec<u8>> {
        self.pending.extend_from_slice(bytes);
        let last_newline = self.pending.iter().rposition(|&b| b == b'\n')?;
        let rest = self.pending.split_off(last_newline + 1);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Take whatever is left, complete or not.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            self.pending.clear();
            return None;
        }
        Some(std::mem::take(&mut self.pending))
    }
}

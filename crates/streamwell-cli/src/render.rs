//! Incremental terminal output for progress snapshots.
//!
//! Snapshots carry the whole text so far; only the unseen suffix is
//! written. Reasoning goes to stderr, the answer to stdout.

use std::io::Write;

use streamwell_types::ProgressUpdate;

/// The part of `current` not yet printed, or `""` when `current` no
/// longer extends what was printed (the final trim can shorten it).
pub fn unseen_suffix<'a>(printed: &str, current: &'a str) -> &'a str {
    current.strip_prefix(printed).unwrap_or("")
}

#[derive(Debug, Default)]
pub struct Renderer {
    show_reasoning: bool,
    reasoning: String,
    content: String,
}

impl Renderer {
    pub fn new(show_reasoning: bool) -> Self {
        Self {
            show_reasoning,
            ..Self::default()
        }
    }

    /// Text to write for `update`: (reasoning, content).
    pub fn advance(&mut self, update: &ProgressUpdate) -> (String, String) {
        let mut reasoning_out = String::new();
        if self.show_reasoning {
            let fresh = unseen_suffix(&self.reasoning, &update.reasoning);
            if !fresh.is_empty() {
                if self.reasoning.is_empty() {
                    reasoning_out.push_str("[thinking] ");
                }
                reasoning_out.push_str(fresh);
                self.reasoning.push_str(fresh);
            }
        }

        let fresh = unseen_suffix(&self.content, &update.content);
        let mut content_out = String::new();
        if !fresh.is_empty() {
            if self.content.is_empty() && !self.reasoning.is_empty() {
                reasoning_out.push('\n');
            }
            content_out.push_str(fresh);
            self.content.push_str(fresh);
        }
        if update.done {
            content_out.push('\n');
        }
        (reasoning_out, content_out)
    }

    /// Write `update` to the terminal.
    pub fn print(&mut self, update: &ProgressUpdate) {
        let (reasoning, content) = self.advance(update);
        if !reasoning.is_empty() {
            let mut err = std::io::stderr().lock();
            let _ = err.write_all(reasoning.as_bytes());
            let _ = err.flush();
        }
        if !content.is_empty() {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(content.as_bytes());
            let _ = out.flush();
        }
    }
}

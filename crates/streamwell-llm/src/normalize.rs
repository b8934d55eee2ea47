//! Text shaping applied while aggregating and before emission.
//!
//! Rules:
//! - newline spellings are unified, including ones split across fragments
//! - the first reasoning fragment is trimmed at both ends
//! - when reasoning exists, the answer keeps at most one leading newline,
//!   however many fragments the leading newlines arrive in
//! - emitted snapshots collapse runs of three or more newlines to two

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use streamwell_types::{ProgressUpdate, StreamAggregate, StreamDelta};

use crate::decoder::NewlineCarry;

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("literal pattern compiles"));

static LEADING_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\n+").expect("literal pattern compiles"));

/// Collapse runs of 3+ newlines to exactly two.
pub fn collapse_blank_lines(text: &str) -> Cow<'_, str> {
    BLANK_RUN.replace_all(text, "\n\n")
}

/// What applying one delta changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// New text was added to either channel.
    pub progressed: bool,
    /// The answer channel went from empty to non-empty.
    pub first_content: bool,
}

/// Folds raw deltas into a [`StreamAggregate`], applying newline
/// normalization and first-fragment rules.
#[derive(Debug, Default)]
pub struct TextShaper {
    reasoning_started: bool,
    content_started: bool,
    reasoning_newlines: NewlineCarry,
    content_newlines: NewlineCarry,
}

impl TextShaper {
    /// A shaper for an aggregate that may already hold a restored prefix.
    pub fn for_aggregate(aggregate: &StreamAggregate) -> Self {
        Self {
            reasoning_started: !aggregate.reasoning.is_empty(),
            content_started: !aggregate.content.trim().is_empty(),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, aggregate: &mut StreamAggregate, delta: &StreamDelta) -> Applied {
        let reasoning = delta
            .reasoning
            .as_deref()
            .map(|r| self.reasoning_newlines.push(r));
        let content = delta
            .content
            .as_deref()
            .map(|c| self.content_newlines.push(c));
        self.fold(aggregate, reasoning.as_deref(), content.as_deref())
    }

    /// Fold in any character held back waiting for the next fragment.
    /// Call once the stream has ended.
    pub fn flush(&mut self, aggregate: &mut StreamAggregate) -> Applied {
        let reasoning = self.reasoning_newlines.finish();
        let content = self.content_newlines.finish();
        self.fold(aggregate, Some(&reasoning), Some(&content))
    }

    fn fold(
        &mut self,
        aggregate: &mut StreamAggregate,
        reasoning: Option<&str>,
        content: Option<&str>,
    ) -> Applied {
        let mut applied = Applied::default();

        if let Some(reasoning) = reasoning {
            let fragment = if self.reasoning_started {
                reasoning
            } else {
                reasoning.trim()
            };
            if !fragment.is_empty() {
                aggregate.reasoning.push_str(fragment);
                self.reasoning_started = true;
                applied.progressed = true;
            }
        }

        if let Some(content) = content {
            let grew = if !self.content_started && !aggregate.reasoning.is_empty() {
                // Leading newlines may span fragments, so shape the joined text.
                let joined = format!("{}{content}", aggregate.content);
                let shaped = LEADING_NEWLINES.replace(&joined, "\n");
                let changed = shaped != aggregate.content;
                if changed {
                    aggregate.content = shaped.into_owned();
                }
                changed
            } else if !content.is_empty() {
                aggregate.content.push_str(content);
                true
            } else {
                false
            };
            if grew {
                applied.progressed = true;
                if !self.content_started && !aggregate.content.trim().is_empty() {
                    self.content_started = true;
                    applied.first_content = true;
                }
            }
        }

        if applied.progressed {
            aggregate.updated_at = Utc::now();
        }
        applied
    }
}

/// Snapshot for a progress callback.
pub fn snapshot(aggregate: &StreamAggregate, done: bool) -> ProgressUpdate {
    ProgressUpdate {
        content: collapse_blank_lines(&aggregate.content).into_owned(),
        reasoning: collapse_blank_lines(&aggregate.reasoning).into_owned(),
        done,
    }
}

/// Final text for a completed generation: collapsed and trimmed.
pub fn finalize(aggregate: &StreamAggregate) -> (String, String) {
    (
        collapse_blank_lines(&aggregate.content).trim().to_owned(),
        collapse_blank_lines(&aggregate.reasoning).trim().to_owned(),
    )
}

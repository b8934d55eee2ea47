//! Streaming data: decoded deltas, the per-generation aggregate, and the
//! snapshots handed to progress callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::ConversationWindow;
use crate::provider::ProviderId;

/// Incremental output decoded from one transport buffer.
///
/// Transient; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDelta {
    /// Answer text fragment.
    pub content: Option<String>,
    /// Reasoning trace fragment.
    pub reasoning: Option<String>,
    /// A completion signal was seen.
    pub done: bool,
}

impl StreamDelta {
    /// A delta that only carries the completion signal.
    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }

    /// Append another delta's fragments, in arrival order.
    pub fn merge(&mut self, other: StreamDelta) {
        if let Some(text) = other.content {
            self.content.get_or_insert_with(String::new).push_str(&text);
        }
        if let Some(text) = other.reasoning {
            self.reasoning.get_or_insert_with(String::new).push_str(&text);
        }
        self.done |= other.done;
    }

    /// `true` when the delta carries no text and no completion signal.
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.reasoning.is_none() && !self.done
    }
}

/// Everything decoded so far for one in-flight generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamAggregate {
    pub session_id: String,
    pub content: String,
    pub reasoning: String,
    pub updated_at: DateTime<Utc>,
}

impl StreamAggregate {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: String::new(),
            reasoning: String::new(),
            updated_at: Utc::now(),
        }
    }

    /// `true` when nothing has been decoded yet.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }
}

/// Immutable snapshot published to a progress callback.
///
/// Each snapshot carries the full text so far, not a fragment; a
/// consumer replaces what it shows instead of appending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub content: String,
    pub reasoning: String,
    pub done: bool,
}

impl ProgressUpdate {
    /// `true` while reasoning may be streaming but no answer text exists.
    pub fn is_thinking(&self) -> bool {
        !self.done && self.content.trim().is_empty()
    }
}

/// Final result of a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    pub content: String,
    pub reasoning: String,
    /// Provider that produced the completed stream.
    pub provider: ProviderId,
}

/// What the resumable state store keeps for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumableState {
    pub aggregate: StreamAggregate,
    /// Conversation to re-issue when resuming.
    pub window: ConversationWindow,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_concatenates_in_order() {
        let mut delta = StreamDelta {
            content: Some("Hel".into()),
            ..StreamDelta::default()
        };
        delta.merge(StreamDelta {
            content: Some("lo".into()),
            reasoning: Some("r".into()),
            done: false,
        });
        delta.merge(StreamDelta::done());

        assert_eq!(delta.content.as_deref(), Some("Hello"));
        assert_eq!(delta.reasoning.as_deref(), Some("r"));
        assert!(delta.done);
    }

    #[test]
    fn default_delta_is_empty() {
        assert!(StreamDelta::default().is_empty());
        assert!(!StreamDelta::done().is_empty());
    }

    #[test]
    fn thinking_until_answer_text_arrives() {
        let mut update = ProgressUpdate {
            reasoning: "hmm".into(),
            ..ProgressUpdate::default()
        };
        assert!(update.is_thinking());
        update.content = "4".into();
        assert!(!update.is_thinking());
    }

    #[test]
    fn aggregate_serde_round_trip() {
        let mut agg = StreamAggregate::new("s1");
        agg.content.push_str("Hello");
        let json = serde_json::to_string(&agg).unwrap();
        let back: StreamAggregate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, agg);
    }
}

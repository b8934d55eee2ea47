//! Chat messages and the bounded conversation window sent to a provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many of the most recent messages are sent with each request.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message as the UI keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id.
    pub id: String,

    pub role: Role,

    /// Answer text.
    pub content: String,

    pub created_at: DateTime<Utc>,

    /// Conversation this message belongs to.
    pub session_id: String,

    /// Reasoning trace, for reasoning-capable assistant replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// The reply has been requested but no answer text has arrived yet.
    #[serde(default)]
    pub thinking: bool,

    /// Whether the reasoning trace is expanded in the UI.
    #[serde(default)]
    pub show_reasoning: bool,
}

impl Message {
    fn with_role(role: Role, session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            role,
            content: content.into(),
            created_at: Utc::now(),
            session_id: session_id.into(),
            reasoning: None,
            thinking: false,
            show_reasoning: false,
        }
    }

    /// A user message.
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_role(Role::User, session_id, content)
    }

    /// A finished assistant message.
    pub fn assistant(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, session_id, content)
    }

    /// An empty assistant reply in the "thinking" state, filled in as the
    /// stream progresses.
    pub fn assistant_placeholder(session_id: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, session_id, "");
        msg.reasoning = Some(String::new());
        msg.thinking = true;
        msg
    }
}

/// Role and text of one message as submitted to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The ordered, bounded list of turns submitted for one generation.
///
/// Holds at most `limit` turns; when built from a longer history the
/// oldest turns are dropped and relative order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationWindow {
    /// Session that owns the generation.
    pub session_id: String,
    turns: Vec<Turn>,
}

impl ConversationWindow {
    /// Build a window from turns, keeping only the newest `limit`.
    pub fn new(session_id: impl Into<String>, turns: Vec<Turn>, limit: usize) -> Self {
        let skip = turns.len().saturating_sub(limit);
        Self {
            session_id: session_id.into(),
            turns: turns.into_iter().skip(skip).collect(),
        }
    }

    /// Build a window from UI messages using [`DEFAULT_WINDOW_SIZE`].
    pub fn from_messages(session_id: impl Into<String>, messages: &[Message]) -> Self {
        Self::from_messages_with_limit(session_id, messages, DEFAULT_WINDOW_SIZE)
    }

    /// Build a window from UI messages, keeping the newest `limit`.
    pub fn from_messages_with_limit(
        session_id: impl Into<String>,
        messages: &[Message],
        limit: usize,
    ) -> Self {
        let turns = messages
            .iter()
            .map(|m| Turn::new(m.role, m.content.clone()))
            .collect();
        Self::new(session_id, turns, limit)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_newest_turns_in_order() {
        let turns: Vec<Turn> = (0..15).map(|i| Turn::user(format!("m{i}"))).collect();
        let window = ConversationWindow::new("s1", turns, DEFAULT_WINDOW_SIZE);

        assert_eq!(window.len(), 10);
        assert_eq!(window.turns()[0].content, "m5");
        assert_eq!(window.turns()[9].content, "m14");
    }

    #[test]
    fn short_history_is_untouched() {
        let window = ConversationWindow::new(
            "s1",
            vec![Turn::user("hi"), Turn::assistant("hello")],
            DEFAULT_WINDOW_SIZE,
        );
        assert_eq!(window.len(), 2);
        assert_eq!(window.turns()[1].role, Role::Assistant);
    }

    #[test]
    fn from_messages_maps_roles_and_content() {
        let msgs = vec![
            Message::assistant("s1", "welcome"),
            Message::user("s1", "2+2?"),
        ];
        let window = ConversationWindow::from_messages("s1", &msgs);
        assert_eq!(window.session_id, "s1");
        assert_eq!(window.turns()[0], Turn::assistant("welcome"));
        assert_eq!(window.turns()[1], Turn::user("2+2?"));
    }

    #[test]
    fn placeholder_starts_thinking() {
        let msg = Message::assistant_placeholder("s1");
        assert!(msg.thinking);
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.id.starts_with("msg_"));
    }

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("s", "x");
        let b = Message::user("s", "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}

//! Wire types for the chat-completions protocol.
//!
//! Requests are serialized from [`ChatRequest`]; streamed frames are
//! deserialized into [`Frame`]. Only the fields this client reads are
//! modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use streamwell_types::{ConversationWindow, ProviderConfig};

/// One message in the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Request body sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

impl ChatRequest {
    /// Streaming request for `window` with the provider's generation defaults.
    pub fn streaming(provider: &ProviderConfig, window: &ConversationWindow) -> Self {
        Self {
            model: provider.model.clone(),
            messages: window
                .turns()
                .iter()
                .map(|t| WireMessage {
                    role: t.role.as_str().to_owned(),
                    content: t.content.clone(),
                })
                .collect(),
            stream: true,
            temperature: provider.temperature,
            max_tokens: provider.max_tokens,
            top_p: provider.top_p,
        }
    }

    /// One-token, non-streaming ping used by health probes.
    pub fn probe(provider: &ProviderConfig) -> Self {
        Self {
            model: provider.model.clone(),
            messages: vec![WireMessage {
                role: "user".into(),
                content: "ping".into(),
            }],
            stream: false,
            temperature: 0.1,
            max_tokens: 1,
            top_p: provider.top_p,
        }
    }
}

/// A parsed `data:` frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub choices: Vec<FrameChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameChoice {
    #[serde(default)]
    pub delta: Option<FrameDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

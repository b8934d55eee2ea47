//! Provider identifiers and per-provider endpoint configuration.
//!
//! The set of providers is fixed: every backend speaks the same
//! OpenAI-style streaming chat-completion protocol and differs only in
//! endpoint, credential, model, and generation defaults.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::secret::SecretString;

/// One of the interchangeable chat-completion backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Volcengine Ark.
    Ark,
    /// SiliconFlow.
    SiliconFlow,
    /// DeepSeek.
    DeepSeek,
}

impl ProviderId {
    /// Every provider, in default priority order.
    pub const ALL: [ProviderId; 3] = [ProviderId::Ark, ProviderId::SiliconFlow, ProviderId::DeepSeek];

    /// Lowercase identifier used in config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Ark => "ark",
            ProviderId::SiliconFlow => "siliconflow",
            ProviderId::DeepSeek => "deepseek",
        }
    }

    /// Prefix for environment overrides (`ARK_API_KEY`, `DEEPSEEK_MODEL`, ...).
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderId::Ark => "ARK",
            ProviderId::SiliconFlow => "SILICONFLOW",
            ProviderId::DeepSeek => "DEEPSEEK",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ark" => Ok(ProviderId::Ark),
            "siliconflow" => Ok(ProviderId::SiliconFlow),
            "deepseek" => Ok(ProviderId::DeepSeek),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.95
}

/// Endpoint, credential, and generation defaults for one provider.
///
/// Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which provider this entry describes.
    pub id: ProviderId,

    /// Full chat-completions endpoint URL.
    #[serde(default)]
    pub url: String,

    /// Bearer credential.
    #[serde(default)]
    pub api_key: SecretString,

    /// Model identifier sent in the request body.
    #[serde(default)]
    pub model: String,

    /// `max_tokens` sent with every generation request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Nucleus sampling parameter.
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Extra HTTP headers for every request to this provider.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Create a config with generation defaults and no credential.
    pub fn new(id: ProviderId, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            api_key: SecretString::default(),
            model: model.into(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            headers: HashMap::new(),
        }
    }

    /// Builder-style credential setter.
    pub fn with_api_key(mut self, key: impl Into<SecretString>) -> Self {
        self.api_key = key.into();
        self
    }

    /// A provider can only be selected when it has somewhere to send
    /// requests and something to authenticate with.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.is_empty()
    }

    /// Fill empty endpoint fields from a built-in entry for the same provider.
    pub fn fill_from(&mut self, builtin: &ProviderConfig) {
        if self.url.trim().is_empty() {
            self.url = builtin.url.clone();
        }
        if self.model.trim().is_empty() {
            self.model = builtin.model.clone();
        }
    }
}

/// Returns the built-in provider entries, in default priority order.
///
/// None of them carry a credential; keys come from the config file or
/// the `<PROVIDER>_API_KEY` environment variables.
pub fn builtin_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(
            ProviderId::Ark,
            "https://ark.cn-beijing.volces.com/api/v3/chat/completions",
            "ep-20250208164736-4s8c4",
        ),
        ProviderConfig::new(
            ProviderId::SiliconFlow,
            "https://api.siliconflow.cn/v1/chat/completions",
            "deepseek-ai/DeepSeek-R1",
        ),
        ProviderConfig::new(
            ProviderId::DeepSeek,
            "https://api.deepseek.com/v1/chat/completions",
            "deepseek-chat",
        ),
    ]
}

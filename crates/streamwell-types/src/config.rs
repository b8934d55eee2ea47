//! Client configuration schema.
//!
//! Every field has a default, so an empty JSON object (or no config file
//! at all) yields a working configuration apart from credentials.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::DEFAULT_WINDOW_SIZE;
use crate::provider::{ProviderConfig, ProviderId, builtin_providers};

/// Root configuration for a streaming client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub request: RequestConfig,
    pub health: HealthConfig,
    /// Provider ids in selection order, highest priority first.
    pub priority: Vec<ProviderId>,
    pub providers: Vec<ProviderConfig>,
    pub error_messages: ErrorMessages,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request: RequestConfig::default(),
            health: HealthConfig::default(),
            priority: ProviderId::ALL.to_vec(),
            providers: builtin_providers(),
            error_messages: ErrorMessages::default(),
        }
    }
}

impl ClientConfig {
    /// Merge file-supplied provider entries with the built-ins.
    ///
    /// Entries missing a URL or model inherit them from the built-in for
    /// the same id; built-ins absent from the file are kept. Duplicate ids
    /// keep the first entry.
    pub fn with_builtin_providers(mut self) -> Self {
        let mut merged: Vec<ProviderConfig> = Vec::new();
        for mut entry in std::mem::take(&mut self.providers) {
            if merged.iter().any(|p| p.id == entry.id) {
                continue;
            }
            if let Some(builtin) = builtin_providers().iter().find(|b| b.id == entry.id) {
                entry.fill_from(builtin);
            }
            merged.push(entry);
        }
        for builtin in builtin_providers() {
            if !merged.iter().any(|p| p.id == builtin.id) {
                merged.push(builtin);
            }
        }
        self.providers = merged;
        self
    }

    /// Look up one provider's configuration.
    pub fn provider(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Mutable lookup, used when applying environment overrides.
    pub fn provider_mut(&mut self, id: ProviderId) -> Option<&mut ProviderConfig> {
        self.providers.iter_mut().find(|p| p.id == id)
    }
}

/// Request, streaming, and retry timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Connect / first-byte and idle timeout.
    pub timeout_ms: u64,
    /// Attempts made by the generic retry helper.
    pub retry_times: u32,
    /// Fixed delay between retry attempts.
    pub retry_delay_ms: u64,
    /// Abort when no decoded progress arrives for this long.
    /// Falls back to `timeout_ms` when unset.
    pub stale_timeout_ms: Option<u64>,
    /// Period of the stream watchdog tick.
    pub watchdog_interval_ms: u64,
    /// Minimum spacing between throttled progress callbacks.
    pub update_interval_ms: u64,
    /// Maximum number of turns sent per request.
    pub window_size: usize,
    /// Persist the aggregate on every throttled emission.
    pub checkpoint_on_emit: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_times: 3,
            retry_delay_ms: 1_000,
            stale_timeout_ms: None,
            watchdog_interval_ms: 5_000,
            update_interval_ms: 100,
            window_size: DEFAULT_WINDOW_SIZE,
            checkpoint_on_emit: true,
        }
    }
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms.unwrap_or(self.timeout_ms))
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms.max(1))
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

/// Provider health bookkeeping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// How long a failed provider is excluded from selection.
    pub cooldown_ms: u64,
    /// Minimum spacing between probes of the same provider.
    pub probe_interval_ms: u64,
    /// Timeout of a single probe request.
    pub probe_timeout_ms: u64,
    /// Failures at or above this count make a provider unavailable.
    pub failure_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 5 * 60 * 1_000,
            probe_interval_ms: 30_000,
            probe_timeout_ms: 5_000,
            failure_threshold: 1,
        }
    }
}

impl HealthConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Short, user-safe failure strings shown instead of technical detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessages {
    pub timeout: String,
    pub network: String,
    pub server: String,
    pub auth: String,
    pub rate_limited: String,
    pub unavailable: String,
    pub invalid_response: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            timeout: "The request timed out, please try again.".into(),
            network: "Network error, please check your connection.".into(),
            server: "The server had a problem, please try again later.".into(),
            auth: "The API key was rejected, please contact the administrator.".into(),
            rate_limited: "Too many requests, please try again shortly.".into(),
            unavailable: "Service temporarily unavailable, please try again later.".into(),
            invalid_response: "Received an invalid response.".into(),
        }
    }
}

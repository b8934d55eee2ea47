//! The transport seam.
//!
//! A [`Transport`] opens a streaming POST and hands back a byte stream.
//! Dropping the stream aborts the underlying request.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use streamwell_types::{ConversationWindow, ProviderConfig, ProviderId, SecretString};

use crate::error::Result;
use crate::types::ChatRequest;

/// Response body as it arrives, in order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Everything needed to issue one request to one provider.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub provider: ProviderId,
    pub url: String,
    /// Sent as `Authorization: Bearer <key>`.
    pub api_key: SecretString,
    /// Extra headers from the provider config.
    pub headers: HashMap<String, String>,
    pub body: ChatRequest,
    /// Bound on connect plus response headers.
    pub timeout: Duration,
}

impl TransportRequest {
    /// Streaming generation request for `window`.
    pub fn streaming(
        provider: &ProviderConfig,
        window: &ConversationWindow,
        timeout: Duration,
    ) -> Self {
        Self {
            provider: provider.id,
            url: provider.url.clone(),
            api_key: provider.api_key.clone(),
            headers: provider.headers.clone(),
            body: ChatRequest::streaming(provider, window),
            timeout,
        }
    }

    /// Health probe request.
    pub fn probe(provider: &ProviderConfig, timeout: Duration) -> Self {
        Self {
            provider: provider.id,
            url: provider.url.clone(),
            api_key: provider.api_key.clone(),
            headers: provider.headers.clone(),
            body: ChatRequest::probe(provider),
            timeout,
        }
    }
}

/// Issues requests to providers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a streaming request. Non-success statuses are returned as
    /// classified errors before any body is read.
    async fn open(&self, request: &TransportRequest) -> Result<ByteStream>;

    /// Send a probe and succeed on any 2xx status.
    async fn probe(&self, request: &TransportRequest) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamwell_types::Turn;

    #[test]
    fn debug_does_not_leak_key() {
        let provider = ProviderConfig::new(ProviderId::Ark, "http://x", "m").with_api_key("sk-secret");
        let window = ConversationWindow::new("s", vec![Turn::user("hi")], 10);
        let req = TransportRequest::streaming(&provider, &window, Duration::from_secs(30));
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(req.body.stream);
        assert_eq!(req.provider, ProviderId::Ark);
    }

    #[test]
    fn probe_request_uses_probe_body() {
        let provider = ProviderConfig::new(ProviderId::DeepSeek, "http://x", "m");
        let req = TransportRequest::probe(&provider, Duration::from_secs(5));
        assert!(!req.body.stream);
        assert_eq!(req.body.max_tokens, 1);
        assert_eq!(req.timeout, Duration::from_secs(5));
    }
}

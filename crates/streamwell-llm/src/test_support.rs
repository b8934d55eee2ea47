//! Scripted in-memory transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use streamwell_types::{ProviderConfig, ProviderId};

use crate::error::{Result, StreamError};
use crate::registry::ProviderRegistry;
use crate::transport::{ByteStream, Transport, TransportRequest};

/// One step of a scripted response body.
pub(crate) enum Step {
    Bytes(String),
    Delay(Duration),
    Error(StreamError),
    /// Never yield again (socket open, nothing arriving).
    Hang,
}

/// What `open` does for one call.
pub(crate) enum Script {
    Reject(StreamError),
    Body(Vec<Step>),
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<ProviderId, VecDeque<Script>>>,
    probe_ok: Mutex<HashMap<ProviderId, bool>>,
    pub opens: Mutex<Vec<TransportRequest>>,
    pub probes: Mutex<Vec<ProviderId>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, provider: ProviderId, script: Script) {
        self.scripts.lock().entry(provider).or_default().push_back(script);
    }

    /// Convenience: a body made of whole frame lines.
    pub fn frames(&self, provider: ProviderId, lines: &[&str]) {
        let steps = lines.iter().map(|l| Step::Bytes(format!("{l}\n"))).collect();
        self.script(provider, Script::Body(steps));
    }

    pub fn set_probe(&self, provider: ProviderId, ok: bool) {
        self.probe_ok.lock().insert(provider, ok);
    }

    pub fn open_count(&self, provider: ProviderId) -> usize {
        self.opens.lock().iter().filter(|r| r.provider == provider).count()
    }

    pub fn probe_count(&self, provider: ProviderId) -> usize {
        self.probes.lock().iter().filter(|p| **p == provider).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: &TransportRequest) -> Result<ByteStream> {
        self.opens.lock().push(request.clone());
        let script = self
            .scripts
            .lock()
            .get_mut(&request.provider)
            .and_then(VecDeque::pop_front);
        let steps = match script {
            Some(Script::Body(steps)) => steps,
            Some(Script::Reject(err)) => return Err(err),
            None => return Err(StreamError::Network("no script".into())),
        };

        let stream = futures_util::stream::unfold(steps.into_iter(), |mut it| async move {
            loop {
                match it.next()? {
                    Step::Bytes(b) => return Some((Ok(Bytes::from(b)), it)),
                    Step::Error(e) => return Some((Err(e), it)),
                    Step::Delay(d) => tokio::time::sleep(d).await,
                    Step::Hang => std::future::pending::<()>().await,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn probe(&self, request: &TransportRequest) -> Result<()> {
        self.probes.lock().push(request.provider);
        let ok = self
            .probe_ok
            .lock()
            .get(&request.provider)
            .copied()
            .unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(StreamError::Server {
                status: 503,
                body: "probe failed".into(),
            })
        }
    }
}

/// All three providers, configured, in default priority order.
pub(crate) fn configured_registry() -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::new(
        ProviderId::ALL
            .iter()
            .map(|id| {
                ProviderConfig::new(*id, format!("http://{}.test/v1/chat", id.as_str()), "m")
                    .with_api_key("sk-test")
            })
            .collect(),
    ))
}

pub(crate) fn content_line(text: &str) -> String {
    format!(
        "data: {}",
        serde_json::json!({"choices": [{"delta": {"content": text}}]})
    )
}

pub(crate) fn reasoning_line(text: &str) -> String {
    format!(
        "data: {}",
        serde_json::json!({"choices": [{"delta": {"reasoning_content": text}}]})
    )
}

//! The public entry point: generate, suspend, cancel, resume.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use streamwell_platform::KeyValueStore;
use streamwell_types::{
    ClientConfig, ConversationWindow, GenerationOutput, ProgressUpdate, ProviderId,
    StreamAggregate,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, StreamError};
use crate::failover::{FailoverDriver, GenerationJob};
use crate::health::{HealthTracker, ProviderStatus};
use crate::http::ReqwestTransport;
use crate::registry::ProviderRegistry;
use crate::retry::RetryConfig;
use crate::session::SessionOptions;
use crate::store::ResumableStateStore;
use crate::transport::Transport;

/// Handle on a running generation.
struct InFlight {
    cancel: CancellationToken,
    suspended: Arc<AtomicBool>,
    /// Set when the generation completed successfully.
    completed: Arc<AtomicBool>,
    /// Closed when the generation ends.
    live: watch::Receiver<StreamAggregate>,
    window: ConversationWindow,
}

type InFlightMap = Mutex<HashMap<String, InFlight>>;

/// Removes the session's entry when the generation future ends or is dropped.
struct InFlightGuard<'a> {
    map: &'a InFlightMap,
    session_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.lock().remove(&self.session_id);
    }
}

/// Streaming chat client with failover and resumable sessions.
///
/// One generation may be in flight per session id; a second `generate` or
/// `resume` for the same id fails with [`StreamError::SessionBusy`].
pub struct StreamClient {
    config: ClientConfig,
    registry: Arc<ProviderRegistry>,
    tracker: HealthTracker,
    transport: Arc<dyn Transport>,
    store: ResumableStateStore,
    options: SessionOptions,
    inflight: InFlightMap,
}

impl StreamClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        let registry = Arc::new(ProviderRegistry::from_config(&config));
        let tracker = HealthTracker::new(
            registry.clone(),
            transport.clone(),
            config.health.clone(),
            RetryConfig::from(&config.request),
        );
        let options = SessionOptions::from(&config.request);
        Self {
            config,
            registry,
            tracker,
            transport,
            store: ResumableStateStore::new(kv),
            options,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// A client over HTTP with a default `reqwest` client.
    pub fn with_http(config: ClientConfig, kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(config, Arc::new(ReqwestTransport::new()), kv)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn health(&self) -> &HealthTracker {
        &self.tracker
    }

    pub fn health_snapshot(&self) -> Vec<ProviderStatus> {
        self.tracker.snapshot()
    }

    /// Probe one provider now (subject to the probe interval).
    pub async fn check_health(&self, id: ProviderId) -> bool {
        self.tracker.check_health(id).await
    }

    pub fn is_in_flight(&self, session_id: &str) -> bool {
        self.inflight.lock().contains_key(session_id)
    }

    /// Stream a reply to `window`.
    ///
    /// The window is re-bounded to the configured size. `on_progress` sees
    /// throttled snapshots and exactly one final update with `done: true`.
    pub async fn generate<F>(&self, window: &ConversationWindow, mut on_progress: F) -> Result<GenerationOutput>
    where
        F: FnMut(ProgressUpdate) + Send,
    {
        let window = ConversationWindow::new(
            window.session_id.clone(),
            window.turns().to_vec(),
            self.config.request.window_size,
        );
        let base = StreamAggregate::new(&window.session_id);
        info!(session_id = %window.session_id, turns = window.len(), "generation started");
        self.drive(window, base, &mut on_progress).await
    }

    /// Continue a saved generation.
    ///
    /// The saved text is published first and new text is appended to it.
    pub async fn resume<F>(&self, session_id: &str, mut on_progress: F) -> Result<GenerationOutput>
    where
        F: FnMut(ProgressUpdate) + Send,
    {
        if self.is_in_flight(session_id) {
            return Err(StreamError::SessionBusy(session_id.to_string()));
        }
        let state = self
            .store
            .load(session_id)
            .await?
            .ok_or_else(|| StreamError::NothingToResume(session_id.to_string()))?;
        info!(
            session_id,
            prefix_len = state.aggregate.content.len(),
            saved_at = %state.saved_at,
            "resuming generation"
        );
        self.drive(state.window, state.aggregate, &mut on_progress).await
    }

    /// Cancel the generation and save what it produced. Returns `false`
    /// when nothing is in flight for `session_id`, or when the generation
    /// completed before the cancel reached it.
    ///
    /// The save happens after the generation has stopped, so no checkpoint
    /// written by the generation can land on top of it. The generation
    /// ends with [`StreamError::Cancelled`] and the saved state stays for
    /// [`resume`](Self::resume). The generation future must keep being
    /// polled (spawned or joined) while this runs.
    pub async fn record_suspend(&self, session_id: &str) -> Result<bool> {
        let entry = self.inflight.lock().get(session_id).map(|f| {
            (
                f.cancel.clone(),
                f.suspended.clone(),
                f.completed.clone(),
                f.live.clone(),
                f.window.clone(),
            )
        });
        let Some((cancel, suspended, completed, mut live, window)) = entry else {
            debug!(session_id, "nothing in flight to suspend");
            return Ok(false);
        };

        suspended.store(true, Ordering::SeqCst);
        cancel.cancel();
        while live.changed().await.is_ok() {}
        if completed.load(Ordering::SeqCst) {
            debug!(session_id, "generation completed before suspend");
            return Ok(false);
        }

        let aggregate = live.borrow().clone();
        self.store.save(session_id, &aggregate, &window).await?;
        info!(session_id, content_len = aggregate.content.len(), "generation suspended");
        Ok(true)
    }

    /// Cancel without keeping state. Returns `false` when nothing is in
    /// flight for `session_id`.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.inflight.lock().get(session_id) {
            Some(f) => {
                f.cancel.cancel();
                info!(session_id, "generation cancel requested");
                true
            }
            None => false,
        }
    }

    async fn drive<F>(
        &self,
        window: ConversationWindow,
        base: StreamAggregate,
        on_progress: &mut F,
    ) -> Result<GenerationOutput>
    where
        F: FnMut(ProgressUpdate) + Send,
    {
        let session_id = window.session_id.clone();
        let cancel = CancellationToken::new();
        let suspended = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicBool::new(false));
        let (live_tx, live_rx) = watch::channel(base.clone());

        let _guard = {
            let mut map = self.inflight.lock();
            if map.contains_key(&session_id) {
                return Err(StreamError::SessionBusy(session_id));
            }
            map.insert(
                session_id.clone(),
                InFlight {
                    cancel: cancel.clone(),
                    suspended: suspended.clone(),
                    completed: completed.clone(),
                    live: live_rx,
                    window: window.clone(),
                },
            );
            InFlightGuard {
                map: &self.inflight,
                session_id: session_id.clone(),
            }
        };

        let driver = FailoverDriver {
            registry: &self.registry,
            tracker: &self.tracker,
            transport: self.transport.as_ref(),
            store: &self.store,
            options: &self.options,
        };
        let job = GenerationJob {
            window: &window,
            base: &base,
            cancel: &cancel,
            live: Some(&live_tx),
        };
        let result = driver.run(&job, on_progress).await;

        match &result {
            Ok(out) => {
                completed.store(true, Ordering::SeqCst);
                info!(session_id = %session_id, provider = %out.provider, "generation finished");
            }
            Err(StreamError::Cancelled) if suspended.load(Ordering::SeqCst) => {
                debug!(session_id = %session_id, "cancelled by suspend, state kept");
            }
            Err(StreamError::Cancelled) => {
                if let Err(e) = self.store.clear(&session_id).await {
                    warn!(session_id = %session_id, error = %e, "failed to clear stream state");
                }
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "generation failed, state kept for resume");
            }
        }
        drop(live_tx);
        result
    }
}

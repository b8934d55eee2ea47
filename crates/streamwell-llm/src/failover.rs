//! Provider failover for one generation.
//!
//! [`FailoverDriver`] asks the health tracker for a provider, runs a
//! [`StreamSession`] against it, and on a retryable failure records the
//! failure and moves on. Each provider is tried at most once per
//! generation. Non-retryable errors (auth, malformed request) are returned
//! immediately.

use streamwell_types::{ConversationWindow, GenerationOutput, ProgressUpdate, StreamAggregate};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, StreamError};
use crate::health::HealthTracker;
use crate::registry::ProviderRegistry;
use crate::session::{SessionOptions, StreamSession};
use crate::store::ResumableStateStore;
use crate::transport::Transport;

/// What one generation needs beyond the shared client state.
pub struct GenerationJob<'a> {
    pub window: &'a ConversationWindow,
    /// Empty for a fresh generation, the restored prefix for a resume.
    pub base: &'a StreamAggregate,
    pub cancel: &'a CancellationToken,
    pub live: Option<&'a watch::Sender<StreamAggregate>>,
}

/// Walks providers in health order until one completes the stream.
pub struct FailoverDriver<'a> {
    pub registry: &'a ProviderRegistry,
    pub tracker: &'a HealthTracker,
    pub transport: &'a dyn Transport,
    pub store: &'a ResumableStateStore,
    pub options: &'a SessionOptions,
}

impl FailoverDriver<'_> {
    /// Run `job`, failing over on transient errors.
    ///
    /// Every attempt restarts from `job.base`, so text from a failed
    /// provider never leaks into the next one's output. On success the
    /// saved state for the session is cleared.
    pub async fn run<F>(&self, job: &GenerationJob<'_>, on_progress: &mut F) -> Result<GenerationOutput>
    where
        F: FnMut(ProgressUpdate) + Send,
    {
        let session_id = job.window.session_id.as_str();
        let mut tried = Vec::new();
        let mut last: Option<StreamError> = None;

        while tried.len() < self.registry.len() {
            let resets = self.tracker.liveness_resets();
            let provider_id = match self.tracker.select_provider() {
                Ok(id) => id,
                Err(e) => return Err(last.map(|l| exhausted(tried.len(), l)).unwrap_or(e)),
            };
            if tried.contains(&provider_id) {
                if self.tracker.liveness_resets() > resets {
                    info!(
                        provider = %provider_id,
                        session_id,
                        attempts = tried.len(),
                        "health reset handed back an already-tried provider, giving up"
                    );
                } else {
                    debug!(provider = %provider_id, "selected provider already tried");
                }
                break;
            }
            let Some(provider) = self.registry.get(provider_id) else {
                return Err(StreamError::NotConfigured(provider_id));
            };
            tried.push(provider_id);
            debug!(provider = %provider_id, session_id, attempt = tried.len(), "starting attempt");

            let mut session = StreamSession::new(provider, self.transport, job.window, self.options)
                .with_cancel(job.cancel.clone())
                .with_checkpoints(self.store);
            if let Some(live) = job.live {
                session = session.with_live(live);
            }

            match session.run(job.base, on_progress).await {
                Ok(output) => {
                    self.tracker.record_success(provider_id);
                    if let Err(e) = self.store.clear(session_id).await {
                        warn!(session_id, error = %e, "failed to clear stream state");
                    }
                    if tried.len() > 1 {
                        info!(provider = %provider_id, session_id, attempts = tried.len(), "succeeded after failover");
                    }
                    return Ok(output);
                }
                Err(StreamError::Cancelled) => return Err(StreamError::Cancelled),
                Err(e) if self.tracker.should_retry(&e) => {
                    warn!(provider = %provider_id, session_id, error = %e, "attempt failed, failing over");
                    self.tracker.record_failure(provider_id).await;
                    if job.cancel.is_cancelled() {
                        return Err(StreamError::Cancelled);
                    }
                    last = Some(e);
                }
                Err(e) => {
                    warn!(provider = %provider_id, session_id, error = %e, "non-retryable error");
                    return Err(e);
                }
            }
        }

        match last {
            Some(e) => Err(exhausted(tried.len(), e)),
            None => Err(StreamError::NoProviderAvailable),
        }
    }
}

fn exhausted(attempts: usize, last: StreamError) -> StreamError {
    StreamError::Exhausted {
        attempts: attempts as u32,
        last: Box::new(last),
    }
}

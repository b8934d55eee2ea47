//! One generation attempt against one provider.
//!
//! [`StreamSession::run`] opens the stream, line-buffers bytes into the
//! decoder, folds deltas into the aggregate, and publishes throttled
//! snapshots. A periodic watchdog enforces the idle and stale-progress
//! timeouts; it lives on the session's stack and is gone when `run`
//! returns, whatever the outcome.

use std::time::Duration;

use futures_util::StreamExt;
use streamwell_types::{
    ConversationWindow, GenerationOutput, ProgressUpdate, ProviderConfig, RequestConfig,
    StreamAggregate,
};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::decoder::{LineBuffer, decode_raw};
use crate::error::{Result, StreamError, TimeoutKind};
use crate::normalize::{TextShaper, finalize, snapshot};
use crate::store::ResumableStateStore;
use crate::transport::{Transport, TransportRequest};

/// Timing knobs for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Bound on opening the stream, and on silence once open.
    pub timeout: Duration,
    /// Bound on bytes arriving with nothing decodable in them.
    pub stale_timeout: Duration,
    pub watchdog_interval: Duration,
    /// Minimum spacing of throttled snapshots.
    pub update_interval: Duration,
    pub checkpoint_on_emit: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&RequestConfig::default())
    }
}

impl From<&RequestConfig> for SessionOptions {
    fn from(config: &RequestConfig) -> Self {
        Self {
            timeout: config.timeout(),
            stale_timeout: config.stale_timeout(),
            watchdog_interval: config.watchdog_interval(),
            update_interval: config.update_interval(),
            checkpoint_on_emit: config.checkpoint_on_emit,
        }
    }
}

/// Spacing of throttled snapshots.
#[derive(Debug)]
struct Throttle {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: bool,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: false,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_emit
            .is_none_or(|last| now.duration_since(last) >= self.interval)
    }

    fn emitted(&mut self, now: Instant) {
        self.last_emit = Some(now);
        self.pending = false;
    }

    /// When a held-back snapshot is due.
    fn deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        self.last_emit.map(|last| last + self.interval)
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Drives a single streaming request end-to-end.
pub struct StreamSession<'a> {
    provider: &'a ProviderConfig,
    transport: &'a dyn Transport,
    window: &'a ConversationWindow,
    options: &'a SessionOptions,
    cancel: CancellationToken,
    store: Option<&'a ResumableStateStore>,
    live: Option<&'a watch::Sender<StreamAggregate>>,
}

impl<'a> StreamSession<'a> {
    pub fn new(
        provider: &'a ProviderConfig,
        transport: &'a dyn Transport,
        window: &'a ConversationWindow,
        options: &'a SessionOptions,
    ) -> Self {
        Self {
            provider,
            transport,
            window,
            options,
            cancel: CancellationToken::new(),
            store: None,
            live: None,
        }
    }

    /// Abort when `cancel` fires; no callbacks follow.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Save the aggregate on every throttled snapshot.
    pub fn with_checkpoints(mut self, store: &'a ResumableStateStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Mirror the aggregate after every applied delta.
    pub fn with_live(mut self, live: &'a watch::Sender<StreamAggregate>) -> Self {
        self.live = Some(live);
        self
    }

    /// Run the attempt, starting from `base` (empty, or a restored prefix).
    ///
    /// Completion is the first `[DONE]` or `finish_reason: "stop"`, or the
    /// end of the body. The final snapshot carries `done: true` and the
    /// trimmed text.
    pub async fn run<F>(self, base: &StreamAggregate, on_progress: &mut F) -> Result<GenerationOutput>
    where
        F: FnMut(ProgressUpdate) + Send,
    {
        let provider = self.provider.id;
        let session_id = self.window.session_id.as_str();
        let mut aggregate = base.clone();
        aggregate.session_id = self.window.session_id.clone();
        let mut shaper = TextShaper::for_aggregate(&aggregate);
        let mut throttle = Throttle::new(self.options.update_interval);

        if !aggregate.is_empty() {
            debug!(session_id, prefix_len = aggregate.content.len(), "seeding from restored prefix");
            self.publish(&aggregate, on_progress).await;
            throttle.emitted(Instant::now());
        }

        let request = TransportRequest::streaming(self.provider, self.window, self.options.timeout);
        let started = Instant::now();
        let mut stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StreamError::Cancelled),
            opened = tokio::time::timeout(self.options.timeout, self.transport.open(&request)) => {
                match opened {
                    Ok(result) => result?,
                    Err(_) => return Err(StreamError::Timeout(TimeoutKind::Connect)),
                }
            }
        };
        debug!(
            provider = %provider,
            session_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stream opened"
        );

        let mut last_byte = Instant::now();
        let mut last_progress = last_byte;
        let period = self.options.watchdog_interval;
        let mut watchdog = tokio::time::interval_at(last_byte + period, period);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lines = LineBuffer::new();
        let mut done = false;

        while !done {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(provider = %provider, session_id, "generation cancelled");
                    return Err(StreamError::Cancelled);
                }
                _ = sleep_until_opt(throttle.deadline()) => {
                    self.publish(&aggregate, on_progress).await;
                    throttle.emitted(Instant::now());
                }
                next = stream.next() => {
                    let complete = match next {
                        Some(Ok(bytes)) => {
                            last_byte = Instant::now();
                            trace!(provider = %provider, bytes = bytes.len(), "chunk received");
                            lines.push(&bytes)
                        }
                        Some(Err(e)) => return Err(e),
                        None => {
                            done = true;
                            let rest = lines.finish();
                            debug!(provider = %provider, session_id, "stream ended");
                            rest
                        }
                    };
                    let Some(complete) = complete else { continue };

                    let mut first_content = false;
                    let mut progressed = false;
                    for delta in decode_raw(&complete) {
                        let applied = shaper.apply(&mut aggregate, &delta);
                        progressed |= applied.progressed || delta.done;
                        first_content |= applied.first_content;
                        if delta.done {
                            done = true;
                        }
                    }
                    if !progressed {
                        continue;
                    }
                    last_progress = Instant::now();
                    if let Some(live) = self.live {
                        live.send_replace(aggregate.clone());
                    }
                    if done {
                        continue;
                    }
                    if first_content || throttle.ready(last_progress) {
                        self.publish(&aggregate, on_progress).await;
                        throttle.emitted(Instant::now());
                    } else {
                        throttle.pending = true;
                    }
                }
                _ = watchdog.tick() => {
                    let now = Instant::now();
                    if now.duration_since(last_byte) >= self.options.timeout {
                        warn!(provider = %provider, session_id, "no bytes received, aborting stream");
                        return Err(StreamError::Timeout(TimeoutKind::Idle));
                    }
                    if now.duration_since(last_progress) >= self.options.stale_timeout {
                        warn!(provider = %provider, session_id, "no decoded progress, aborting stream");
                        return Err(StreamError::Timeout(TimeoutKind::StaleProgress));
                    }
                }
            }
        }

        if shaper.flush(&mut aggregate).progressed
            && let Some(live) = self.live
        {
            live.send_replace(aggregate.clone());
        }
        if aggregate.is_empty() {
            warn!(provider = %provider, session_id, "stream completed with no content");
        }
        let (content, reasoning) = finalize(&aggregate);
        if !self.cancel.is_cancelled() {
            on_progress(ProgressUpdate {
                content: content.clone(),
                reasoning: reasoning.clone(),
                done: true,
            });
        }
        debug!(
            provider = %provider,
            session_id,
            content_len = content.len(),
            reasoning_len = reasoning.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation complete"
        );
        Ok(GenerationOutput {
            content,
            reasoning,
            provider,
        })
    }

    /// Hand a snapshot to the callback and checkpoint it.
    async fn publish<F>(&self, aggregate: &StreamAggregate, on_progress: &mut F)
    where
        F: FnMut(ProgressUpdate) + Send,
    {
        if self.cancel.is_cancelled() {
            return;
        }
        on_progress(snapshot(aggregate, false));
        if self.options.checkpoint_on_emit
            && let Some(store) = self.store
            && let Err(e) = store
                .save(&aggregate.session_id, aggregate, self.window)
                .await
        {
            warn!(session_id = %aggregate.session_id, error = %e, "checkpoint failed");
        }
    }
}

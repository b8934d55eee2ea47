//! Provider health tracking and selection.
//!
//! Each provider moves between two states:
//!
//! ```text
//! AVAILABLE --failure--> COOLING_DOWN --cooldown expires / success--> AVAILABLE
//! ```
//!
//! [`HealthTracker`] owns one record per provider behind a single lock.
//! Critical sections are short and never span an `.await`; probes run
//! with the lock released.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use streamwell_types::{HealthConfig, ProviderId};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Result, StreamError};
use crate::registry::ProviderRegistry;
use crate::retry::{RetryConfig, retry_with};
use crate::transport::{Transport, TransportRequest};

#[derive(Debug, Clone)]
struct ProviderHealth {
    failures: u32,
    last_failure: Option<Instant>,
    cooldown_until: Option<Instant>,
    last_probe: Option<Instant>,
    last_checked: Option<DateTime<Utc>>,
    available: bool,
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self {
            failures: 0,
            last_failure: None,
            cooldown_until: None,
            last_probe: None,
            last_checked: None,
            available: true,
        }
    }
}

impl ProviderHealth {
    fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }

    /// Back to AVAILABLE. Probe timestamps survive.
    fn reset(&mut self) {
        self.failures = 0;
        self.last_failure = None;
        self.cooldown_until = None;
        self.available = true;
    }
}

#[derive(Debug, Default)]
struct HealthState {
    records: HashMap<ProviderId, ProviderHealth>,
    /// Replacement found by the last failure's probe walk; consumed by
    /// the next selection.
    preferred: Option<ProviderId>,
    /// Liveness resets performed so far.
    resets: u64,
}

impl HealthState {
    fn record(&mut self, id: ProviderId) -> &mut ProviderHealth {
        self.records.entry(id).or_default()
    }

    fn expire_cooldowns(&mut self, now: Instant) {
        for (id, rec) in &mut self.records {
            if rec.cooldown_until.is_some_and(|until| until <= now) {
                debug!(provider = %id, "cooldown expired");
                rec.reset();
            }
        }
    }
}

/// Point-in-time view of one provider's health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub provider: ProviderId,
    pub configured: bool,
    pub available: bool,
    pub failures: u32,
    pub in_cooldown: bool,
    pub cooldown_remaining_ms: u64,
    /// Wall-clock time of the last probe.
    pub last_checked: Option<DateTime<Utc>>,
}

/// Per-provider failure bookkeeping, cooldowns, and selection.
pub struct HealthTracker {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
    config: HealthConfig,
    probe_retry: RetryConfig,
    state: Mutex<HealthState>,
}

impl HealthTracker {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        transport: Arc<dyn Transport>,
        config: HealthConfig,
        probe_retry: RetryConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
            probe_retry,
            state: Mutex::new(HealthState::default()),
        }
    }

    fn threshold(&self) -> u32 {
        self.config.failure_threshold.max(1)
    }

    /// Record a failure and look for a healthy replacement.
    ///
    /// Once the failure count reaches the threshold the provider is marked
    /// unavailable and cooled down. Providers after it in priority order
    /// are then probed until one passes; if none does, every other
    /// provider not in cooldown is probed from the top. A passing provider
    /// becomes the next selection.
    pub async fn record_failure(&self, id: ProviderId) {
        let now = Instant::now();
        let (after, wrapped) = {
            let mut state = self.state.lock();
            state.expire_cooldowns(now);
            let threshold = self.threshold();
            let cooldown = self.config.cooldown();
            let rec = state.record(id);
            rec.failures = rec.failures.saturating_add(1);
            rec.last_failure = Some(now);
            if rec.failures >= threshold {
                rec.available = false;
                rec.cooldown_until = Some(now + cooldown);
            }
            warn!(
                provider = %id,
                failures = rec.failures,
                cooldown_ms = self.config.cooldown_ms,
                "provider failed"
            );
            if state.preferred == Some(id) {
                state.preferred = None;
            }

            let ids: Vec<ProviderId> = self.registry.ids().collect();
            let pos = ids.iter().position(|p| *p == id);
            let after: Vec<ProviderId> = pos
                .map(|pos| ids[pos + 1..].to_vec())
                .unwrap_or_default()
                .into_iter()
                .filter(|p| {
                    let rec = state.record(*p);
                    rec.available && !rec.in_cooldown(now)
                })
                .collect();
            let wrapped: Vec<ProviderId> = ids
                .into_iter()
                .filter(|p| *p != id && !state.record(*p).in_cooldown(now))
                .collect();
            (after, wrapped)
        };

        for candidate in after.into_iter().chain(wrapped) {
            if self.check_health(candidate).await {
                info!(from = %id, to = %candidate, "switching provider");
                self.state.lock().preferred = Some(candidate);
                return;
            }
        }
        warn!(failed = %id, "no healthy replacement found, falling back to priority order");
    }

    /// Full reset: failures cleared, cooldown lifted, available.
    pub fn record_success(&self, id: ProviderId) {
        let mut state = self.state.lock();
        let rec = state.record(id);
        if rec.failures > 0 || !rec.available {
            debug!(provider = %id, "provider recovered");
        }
        rec.reset();
    }

    /// Probe a provider, at most once per probe interval.
    ///
    /// Within the interval the last known availability is returned without
    /// I/O. Failure counts and cooldowns are never touched; only the probe
    /// time and availability flag are updated. An unconfigured provider is
    /// marked unavailable without a request.
    pub async fn check_health(&self, id: ProviderId) -> bool {
        let started = Instant::now();
        {
            let mut state = self.state.lock();
            let interval = self.config.probe_interval();
            let rec = state.record(id);
            if let Some(last) = rec.last_probe
                && started.duration_since(last) < interval
            {
                debug!(provider = %id, available = rec.available, "probe rate-limited");
                return rec.available;
            }
            if !self.registry.is_configured(id) {
                warn!(provider = %id, "provider not configured, marking unavailable");
                rec.available = false;
                rec.last_probe = Some(started);
                rec.last_checked = Some(Utc::now());
                return false;
            }
        }

        let Some(provider) = self.registry.get(id) else {
            return false;
        };
        let request = TransportRequest::probe(provider, self.config.probe_timeout());
        let transport = &self.transport;
        let result = retry_with(&self.probe_retry, "health probe", |_| {
            transport.probe(&request)
        })
        .await;

        let healthy = match &result {
            Ok(()) => {
                debug!(provider = %id, elapsed_ms = started.elapsed().as_millis() as u64, "probe passed");
                true
            }
            Err(e) => {
                warn!(provider = %id, error = %e, "probe failed");
                false
            }
        };

        let mut state = self.state.lock();
        let rec = state.record(id);
        rec.available = healthy;
        rec.last_probe = Some(started);
        rec.last_checked = Some(Utc::now());
        healthy
    }

    /// Pick the provider for the next request.
    ///
    /// A replacement found by the last failure's probe walk wins if still
    /// eligible; otherwise the first configured, available provider not in
    /// cooldown in priority order. When nothing qualifies every record is
    /// reset and the highest-priority configured provider is returned.
    pub fn select_provider(&self) -> Result<ProviderId> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.expire_cooldowns(now);

        let registry = &self.registry;
        let eligible = |state: &mut HealthState, id: ProviderId| {
            let rec = state.record(id);
            registry.is_configured(id) && rec.available && !rec.in_cooldown(now)
        };

        if let Some(preferred) = state.preferred.take()
            && eligible(&mut *state, preferred)
        {
            debug!(provider = %preferred, "selected preferred provider");
            return Ok(preferred);
        }
        for id in self.registry.ids() {
            if eligible(&mut *state, id) {
                debug!(provider = %id, "selected provider");
                return Ok(id);
            }
        }

        info!("every provider unavailable or cooling down, resetting health");
        for id in self.registry.ids() {
            state.record(id).reset();
        }
        state.preferred = None;
        state.resets += 1;
        self.registry
            .ids()
            .find(|id| self.registry.is_configured(*id))
            .ok_or(StreamError::NoProviderAvailable)
    }

    /// Whether `err` should trigger a provider switch.
    pub fn should_retry(&self, err: &StreamError) -> bool {
        err.is_retryable()
    }

    /// Health of every provider, in priority order.
    pub fn snapshot(&self) -> Vec<ProviderStatus> {
        let now = Instant::now();
        let threshold = self.threshold();
        let mut state = self.state.lock();
        state.expire_cooldowns(now);
        self.registry
            .ids()
            .map(|id| {
                let rec = state.record(id);
                let in_cooldown = rec.in_cooldown(now);
                let remaining = rec
                    .cooldown_until
                    .map(|until| until.saturating_duration_since(now).as_millis() as u64)
                    .unwrap_or(0);
                ProviderStatus {
                    provider: id,
                    configured: self.registry.is_configured(id),
                    available: rec.available && rec.failures < threshold && !in_cooldown,
                    failures: rec.failures,
                    in_cooldown,
                    cooldown_remaining_ms: remaining,
                    last_checked: rec.last_checked,
                }
            })
            .collect()
    }

    /// The replacement picked by the last probe walk, if any.
    pub fn preferred(&self) -> Option<ProviderId> {
        self.state.lock().preferred
    }

    /// Number of liveness resets `select_provider` has performed.
    pub fn liveness_resets(&self) -> u64 {
        self.state.lock().resets
    }
}

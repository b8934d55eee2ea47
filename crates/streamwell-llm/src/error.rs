//! Error taxonomy for streaming generations.
//!
//! Every operation in this crate returns [`Result<T>`] with [`StreamError`].
//! `Display` carries technical detail for logs; [`StreamError::user_message`]
//! gives the short string a user should see.

use std::fmt;

use streamwell_platform::StoreError;
use streamwell_types::{ErrorMessages, ProviderId};
use thiserror::Error;

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// No response headers within the request timeout.
    Connect,
    /// No bytes at all for the request timeout.
    Idle,
    /// Bytes kept arriving but nothing new was decoded.
    StaleProgress,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Idle => "idle",
            Self::StaleProgress => "stale progress",
        })
    }
}

/// Errors surfaced by the streaming client.
#[derive(Error, Debug)]
pub enum StreamError {
    /// HTTP 401/403. Switching providers cannot fix a credential.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// HTTP 429.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// HTTP 5xx.
    #[error("server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    /// Any other non-success status.
    #[error("request rejected (HTTP {status}): {body}")]
    Client { status: u16, body: String },

    /// Connection, DNS, TLS, or mid-stream read failure.
    #[error("network error: {0}")]
    Network(String),

    #[error("{0} timeout")]
    Timeout(TimeoutKind),

    /// A malformed frame. Absorbed by the decoder, never returned to callers.
    #[error("decode error: {0}")]
    Decode(String),

    /// Nothing selectable even after the liveness reset.
    #[error("no provider available")]
    NoProviderAvailable,

    /// The provider has no endpoint or no credential.
    #[error("provider not configured: {0}")]
    NotConfigured(ProviderId),

    #[error("generation cancelled")]
    Cancelled,

    #[error("session {0} already has a generation in flight")]
    SessionBusy(String),

    #[error("no saved stream for session {0}")]
    NothingToResume(String),

    #[error("state store error: {0}")]
    Storage(String),

    /// Every distinct provider was tried once and failed.
    #[error("all {attempts} attempts failed, last error: {last}")]
    Exhausted { attempts: u32, last: Box<StreamError> },
}

/// A convenience type alias for streaming operations.
pub type Result<T> = std::result::Result<T, StreamError>;

impl From<StoreError> for StreamError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl StreamError {
    /// Whether the error is eligible for retry and provider failover.
    ///
    /// Timeouts, network failures, 429 and 5xx qualify. Everything else,
    /// notably authentication failures, propagates immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Network(_) | Self::Timeout(_)
        )
    }

    /// Short, user-safe description drawn from `messages`.
    pub fn user_message(&self, messages: &ErrorMessages) -> String {
        match self {
            Self::Auth { .. } => messages.auth.clone(),
            Self::RateLimited { .. } => messages.rate_limited.clone(),
            Self::Server { .. } => messages.server.clone(),
            Self::Network(_) => messages.network.clone(),
            Self::Timeout(_) => messages.timeout.clone(),
            Self::Client { .. } | Self::Decode(_) => messages.invalid_response.clone(),
            Self::NoProviderAvailable | Self::NotConfigured(_) | Self::Storage(_) => {
                messages.unavailable.clone()
            }
            Self::Exhausted { last, .. } => last.user_message(messages),
            Self::Cancelled | Self::SessionBusy(_) | Self::NothingToResume(_) => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_auth() {
        let err = StreamError::Auth {
            status: 401,
            message: "invalid token".into(),
        };
        assert_eq!(err.to_string(), "authentication failed (HTTP 401): invalid token");
    }

    #[test]
    fn display_timeouts() {
        assert_eq!(StreamError::Timeout(TimeoutKind::Idle).to_string(), "idle timeout");
        assert_eq!(
            StreamError::Timeout(TimeoutKind::StaleProgress).to_string(),
            "stale progress timeout"
        );
    }

    #[test]
    fn display_exhausted_wraps_last() {
        let err = StreamError::Exhausted {
            attempts: 3,
            last: Box::new(StreamError::Server {
                status: 503,
                body: "down".into(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "all 3 attempts failed, last error: server error (HTTP 503): down"
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(StreamError::RateLimited { retry_after_ms: 10 }.is_retryable());
        assert!(
            StreamError::Server {
                status: 500,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(StreamError::Network("reset".into()).is_retryable());
        assert!(StreamError::Timeout(TimeoutKind::Connect).is_retryable());

        assert!(
            !StreamError::Auth {
                status: 403,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !StreamError::Client {
                status: 400,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!StreamError::Cancelled.is_retryable());
        assert!(!StreamError::NoProviderAvailable.is_retryable());
    }

    #[test]
    fn user_message_hides_detail() {
        let msgs = ErrorMessages::default();
        let err = StreamError::Server {
            status: 502,
            body: "upstream connect error at 10.0.0.7".into(),
        };
        let shown = err.user_message(&msgs);
        assert_eq!(shown, msgs.server);
        assert!(!shown.contains("10.0.0.7"));
    }

    #[test]
    fn user_message_of_exhausted_uses_last_error() {
        let msgs = ErrorMessages::default();
        let err = StreamError::Exhausted {
            attempts: 2,
            last: Box::new(StreamError::Timeout(TimeoutKind::Idle)),
        };
        assert_eq!(err.user_message(&msgs), msgs.timeout);
        assert_eq!(StreamError::NoProviderAvailable.user_message(&msgs), msgs.unavailable);
    }

    #[test]
    fn store_error_converts_to_storage() {
        let err: StreamError = StoreError::InvalidKey(String::new()).into();
        assert!(matches!(err, StreamError::Storage(_)));
    }
}

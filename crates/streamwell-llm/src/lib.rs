//! Streaming chat-completion client with provider failover and resumable
//! sessions.
//!
//! # Architecture
//!
//! - [`Transport`] opens a byte stream to a provider; [`ReqwestTransport`]
//!   is the HTTP implementation
//! - [`decoder`] turns `data:` frames into [`StreamDelta`](streamwell_types::StreamDelta)s
//! - [`StreamSession`] runs one attempt: throttled progress, idle and
//!   stale-progress watchdog, cancellation, checkpoints
//! - [`HealthTracker`] counts failures, cools providers down, and picks
//!   the next provider
//! - [`StreamClient`] ties it together and owns the in-flight sessions
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use streamwell_llm::StreamClient;
//! use streamwell_platform::MemoryStore;
//! use streamwell_types::{ClientConfig, ConversationWindow, Turn};
//!
//! let client = StreamClient::with_http(ClientConfig::default(), Arc::new(MemoryStore::new()));
//! let window = ConversationWindow::new("s1", vec![Turn::user("2+2?")], 10);
//! let out = client
//!     .generate(&window, |update| println!("{}", update.content))
//!     .await?;
//! println!("{} (via {})", out.content, out.provider);
//! ```

pub mod client;
pub mod decoder;
pub mod error;
pub mod failover;
pub mod health;
pub mod http;
pub mod normalize;
pub mod registry;
pub mod retry;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use client::StreamClient;
pub use error::{Result, StreamError, TimeoutKind};
pub use failover::{FailoverDriver, GenerationJob};
pub use health::{HealthTracker, ProviderStatus};
pub use http::ReqwestTransport;
pub use registry::ProviderRegistry;
pub use retry::RetryConfig;
pub use session::{SessionOptions, StreamSession};
pub use store::ResumableStateStore;
pub use transport::{ByteStream, Transport, TransportRequest};
pub use types::ChatRequest;

//! # streamwell-types
//!
//! Plain data shared by every streamwell crate:
//!
//! - **[`provider`]** -- provider ids, endpoint configs, built-in registry entries
//! - **[`message`]** -- chat messages and the bounded [`ConversationWindow`]
//! - **[`stream`]** -- decoded deltas, the running aggregate, progress snapshots
//! - **[`config`]** -- the [`ClientConfig`] schema and its defaults
//! - **[`secret`]** -- [`SecretString`] for credentials

pub mod config;
pub mod message;
pub mod provider;
pub mod secret;
pub mod stream;

pub use config::{ClientConfig, ErrorMessages, HealthConfig, RequestConfig};
pub use message::{ConversationWindow, DEFAULT_WINDOW_SIZE, Message, Role, Turn};
pub use provider::{ProviderConfig, ProviderId, builtin_providers};
pub use secret::SecretString;
pub use stream::{GenerationOutput, ProgressUpdate, ResumableState, StreamAggregate, StreamDelta};

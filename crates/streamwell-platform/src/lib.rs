//! Platform seams for streamwell.
//!
//! - [`fs`]: filesystem access
//! - [`env`]: environment variables
//! - [`kv`]: abstract key-value persistence with memory and file backends
//! - [`config_loader`]: config discovery, key normalization, env overrides

pub mod config_loader;
pub mod env;
pub mod fs;
pub mod kv;

pub use config_loader::{ConfigError, load_client_config};
pub use env::{Environment, MapEnvironment, NativeEnvironment};
pub use fs::{FileSystem, NativeFileSystem};
pub use kv::{FileStore, KeyValueStore, MemoryStore, StoreError};

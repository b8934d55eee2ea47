//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. `STREAMWELL_CONFIG` environment variable (path to a JSON file).
//! 2. `~/.streamwell/config.json`
//! 3. If none found, built-in defaults.
//!
//! JSON keys are normalized from camelCase to snake_case before
//! deserializing. Credentials and endpoints can then be overridden per
//! provider with `<PREFIX>_API_KEY`, `<PREFIX>_API_URL`, `<PREFIX>_MODEL`
//! (prefixes `ARK`, `SILICONFLOW`, `DEEPSEEK`).

use std::path::PathBuf;

use serde_json::Value;
use streamwell_types::{ClientConfig, ProviderId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::env::Environment;
use crate::fs::FileSystem;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "STREAMWELL_CONFIG";

/// Errors from reading or parsing a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Discover the config file path using the fallback chain.
///
/// The env var wins even when the file it names is missing; the loader
/// then warns and falls back to defaults.
pub fn discover_config_path(env: &dyn Environment, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(env_path) = env.get_var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }
    home_dir.map(|home| home.join(".streamwell").join("config.json"))
}

/// Load raw, key-normalized JSON configuration.
///
/// Returns an empty object when no config file exists.
pub async fn load_config_raw(
    fs: &dyn FileSystem,
    env: &dyn Environment,
) -> Result<Value, ConfigError> {
    let Some(path) = discover_config_path(env, fs.home_dir()) else {
        info!("no home directory, using default config");
        return Ok(Value::Object(serde_json::Map::new()));
    };

    if !fs.exists(&path).await {
        if env.get_var(CONFIG_ENV_VAR).is_some() {
            warn!(path = %path.display(), "config path does not exist, using defaults");
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
        }
        return Ok(Value::Object(serde_json::Map::new()));
    }

    debug!(path = %path.display(), "loading config file");
    let contents = fs
        .read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
    let value: Value =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;

    Ok(normalize_keys(value))
}

/// Discover, parse, merge with built-ins, and apply env overrides.
pub async fn load_client_config(
    fs: &dyn FileSystem,
    env: &dyn Environment,
) -> Result<ClientConfig, ConfigError> {
    let raw = load_config_raw(fs, env).await?;
    let config: ClientConfig = serde_json::from_value(raw)?;
    let mut config = config.with_builtin_providers();
    apply_env_overrides(&mut config, env);

    let configured: Vec<&str> = config
        .providers
        .iter()
        .filter(|p| p.is_configured())
        .map(|p| p.id.as_str())
        .collect();
    info!(providers = ?configured, "configured providers");
    if configured.is_empty() {
        warn!("no provider has both an endpoint and an API key");
    }

    Ok(config)
}

/// Apply `<PREFIX>_API_KEY` / `_API_URL` / `_MODEL` overrides.
pub fn apply_env_overrides(config: &mut ClientConfig, env: &dyn Environment) {
    for id in ProviderId::ALL {
        let Some(provider) = config.provider_mut(id) else {
            continue;
        };
        let prefix = id.env_prefix();
        if let Some(key) = env.get_var(&format!("{prefix}_API_KEY")) {
            debug!(provider = %id, "api key from environment");
            provider.api_key = key.into();
        }
        if let Some(url) = env.get_var(&format!("{prefix}_API_URL")) {
            debug!(provider = %id, url = %url, "endpoint from environment");
            provider.url = url;
        }
        if let Some(model) = env.get_var(&format!("{prefix}_MODEL")) {
            provider.model = model;
        }
    }
}

/// Convert camelCase JSON keys to snake_case recursively.
///
/// Values under a `headers` key are left alone; those are HTTP header
/// names, not schema fields.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut new_map = serde_json::Map::new();
            for (key, val) in map {
                let snake_key = camel_to_snake(&key);
                let val = if snake_key == "headers" {
                    val
                } else {
                    normalize_keys(val)
                };
                new_map.insert(snake_key, val);
            }
            Value::Object(new_map)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Convert a single camelCase string to snake_case.
///
/// A run of uppercase letters stays together; an underscore goes before
/// its last letter only when a lowercase letter follows.
///
/// ```
/// # use streamwell_platform::config_loader::camel_to_snake;
/// assert_eq!(camel_to_snake("retryDelayMs"), "retry_delay_ms");
/// assert_eq!(camel_to_snake("apiURLOverride"), "api_url_override");
/// assert_eq!(camel_to_snake("timeout_ms"), "timeout_ms");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(|c| c.is_lowercase()))
            {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }
    result
}

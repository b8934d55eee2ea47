//! CLI command implementations for `swell`.
//!
//! - [`chat`] -- `chat` and `resume`.
//! - [`health`] -- Provider health table.
//! - [`config_cmd`] -- Resolved configuration dump.

pub mod chat;
pub mod config_cmd;
pub mod health;

use std::path::Path;
use std::sync::Arc;

use streamwell_llm::StreamClient;
use streamwell_platform::config_loader::{self, apply_env_overrides, normalize_keys};
use streamwell_platform::{FileStore, FileSystem, NativeEnvironment, NativeFileSystem};
use streamwell_types::ClientConfig;

/// Load configuration from the given path override or via auto-discovery.
///
/// Discovery order: `STREAMWELL_CONFIG`, then `~/.streamwell/config.json`,
/// then built-in defaults. Provider env overrides apply either way.
pub async fn load_config(config_override: Option<&str>) -> anyhow::Result<ClientConfig> {
    let fs = NativeFileSystem;
    let env = NativeEnvironment;

    let Some(path_str) = config_override else {
        return config_loader::load_client_config(&fs, &env)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {e}"));
    };

    let path = Path::new(path_str);
    if !fs.exists(path).await {
        anyhow::bail!("config file not found: {path_str}");
    }
    let contents = fs
        .read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read config: {e}"))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;
    let config: ClientConfig = serde_json::from_value(normalize_keys(value))?;
    let mut config = config.with_builtin_providers();
    apply_env_overrides(&mut config, &env);
    Ok(config)
}

/// A client over HTTP with state under `~/.streamwell/state/`.
pub fn build_client(config: ClientConfig) -> anyhow::Result<StreamClient> {
    let fs = NativeFileSystem;
    let root = FileStore::default_root(&fs)
        .ok_or_else(|| anyhow::anyhow!("cannot locate home directory for state storage"))?;
    Ok(StreamClient::with_http(config, Arc::new(FileStore::new(root))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn override_file_is_read_with_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"request": {"timeoutMs": 5000, "windowSize": 4, "checkpointOnEmit": false}}"#,
        )
        .unwrap();

        let config = load_config(path.to_str()).await.unwrap();
        assert_eq!(config.request.timeout_ms, 5_000);
        assert_eq!(config.request.window_size, 4);
        assert!(!config.request.checkpoint_on_emit);
        assert_eq!(config.providers.len(), 3);
    }

    #[tokio::test]
    async fn missing_override_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = load_config(path.to_str()).await.unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[tokio::test]
    async fn malformed_override_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_config(path.to_str()).await.unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}

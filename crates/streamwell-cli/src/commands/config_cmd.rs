//! `swell config show` -- print the resolved configuration.
//!
//! Credentials serialize as empty strings, so the dump is safe to paste.
//! A `configured` flag per provider shows which ones have a key.

use serde_json::Value;
use streamwell_types::ClientConfig;

use super::load_config;

/// Show the resolved configuration as JSON.
pub async fn show(config_override: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_override).await?;
    println!("{}", serde_json::to_string_pretty(&annotated(&config)?)?);
    Ok(())
}

/// The config as JSON with `api_key` replaced by a `configured` flag.
pub fn annotated(config: &ClientConfig) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(config)?;
    if let Some(providers) = value.get_mut("providers").and_then(Value::as_array_mut) {
        for (entry, provider) in providers.iter_mut().zip(&config.providers) {
            if let Some(obj) = entry.as_object_mut() {
                obj.remove("api_key");
                obj.insert("configured".into(), Value::Bool(provider.is_configured()));
            }
        }
    }
    Ok(value)
}

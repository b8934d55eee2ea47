//! Provider registry in priority order.

use streamwell_types::{ClientConfig, ProviderConfig, ProviderId};

/// Immutable provider configs, highest priority first.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Order `config.providers` by `config.priority`. Providers missing
    /// from the priority list follow in config order; duplicates keep
    /// their first position.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut providers: Vec<ProviderConfig> = Vec::with_capacity(config.providers.len());
        for id in &config.priority {
            if providers.iter().any(|p| p.id == *id) {
                continue;
            }
            if let Some(p) = config.provider(*id) {
                providers.push(p.clone());
            }
        }
        for p in &config.providers {
            if !providers.iter().any(|existing| existing.id == p.id) {
                providers.push(p.clone());
            }
        }
        Self { providers }
    }

    /// Build directly from configs already in priority order.
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self { providers }
    }

    pub fn get(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Provider ids, highest priority first.
    pub fn ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.providers.iter().map(|p| p.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter()
    }

    pub fn is_configured(&self, id: ProviderId) -> bool {
        self.get(id).is_some_and(ProviderConfig::is_configured)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_follows_builtin_priority() {
        let reg = ProviderRegistry::from_config(&ClientConfig::default());
        let ids: Vec<_> = reg.ids().collect();
        assert_eq!(ids, vec![ProviderId::Ark, ProviderId::SiliconFlow, ProviderId::DeepSeek]);
        assert!(!reg.is_configured(ProviderId::Ark));
    }

    #[test]
    fn custom_priority_reorders_and_appends_rest() {
        let config = ClientConfig {
            priority: vec![ProviderId::DeepSeek, ProviderId::DeepSeek],
            ..ClientConfig::default()
        };
        let reg = ProviderRegistry::from_config(&config);
        let ids: Vec<_> = reg.ids().collect();
        assert_eq!(ids, vec![ProviderId::DeepSeek, ProviderId::Ark, ProviderId::SiliconFlow]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn configured_requires_url_and_key() {
        let reg = ProviderRegistry::new(vec![
            ProviderConfig::new(ProviderId::Ark, "http://a", "m").with_api_key("k"),
            ProviderConfig::new(ProviderId::DeepSeek, "", "m").with_api_key("k"),
        ]);
        assert!(reg.is_configured(ProviderId::Ark));
        assert!(!reg.is_configured(ProviderId::DeepSeek));
        assert!(!reg.is_configured(ProviderId::SiliconFlow));
    }
}

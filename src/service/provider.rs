//! Provider registry in the scope's config document

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{check, MemoryService};
use crate::collab::{HttpProvider, Provider};
use crate::config::ProviderConfig;
use crate::error::{MemError, Result};

const TEST_PROMPT: &str = "Say hello";

/// A registered provider as listed to the user
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEntry {
    pub name: String,
    pub model: String,
    pub base_url: Option<String>,
    pub is_default: bool,
}

impl MemoryService {
    /// Registered providers, sorted by name
    pub fn providers(&self, hint: &str, cancel: &CancellationToken) -> Result<Vec<ProviderEntry>> {
        check(cancel)?;
        let config = self.config(&self.scope(hint))?;

        Ok(config
            .providers
            .iter()
            .map(|(name, p)| ProviderEntry {
                name: name.clone(),
                model: p.model.clone(),
                base_url: p.base_url.clone(),
                is_default: config.default_provider.as_deref() == Some(name.as_str()),
            })
            .collect())
    }

    /// Register or replace a provider
    pub fn add_provider(
        &self,
        hint: &str,
        name: &str,
        provider: ProviderConfig,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check(cancel)?;
        HttpProvider::from_config(name, &provider)?;

        let scope = self.scope(hint);
        let mut config = self.config(&scope)?;
        config.providers.insert(name.to_string(), provider);
        config.save_to(&scope.config_path())?;

        info!(provider = name, "added provider");
        Ok(())
    }

    /// Unregister a provider; removing the default clears it
    pub fn remove_provider(&self, hint: &str, name: &str, cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        let scope = self.scope(hint);
        let mut config = self.config(&scope)?;

        if config.providers.remove(name).is_none() {
            return Err(MemError::NotFound(format!("provider {}", name)));
        }
        if config.default_provider.as_deref() == Some(name) {
            config.default_provider = None;
        }
        config.save_to(&scope.config_path())?;

        info!(provider = name, "removed provider");
        Ok(())
    }

    pub fn set_default_provider(
        &self,
        hint: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check(cancel)?;
        let scope = self.scope(hint);
        let mut config = self.config(&scope)?;

        if !config.providers.contains_key(name) {
            return Err(MemError::NotFound(format!("provider {}", name)));
        }
        config.default_provider = Some(name.to_string());
        config.save_to(&scope.config_path())
    }

    /// Round-trip a short prompt through a registered provider
    pub async fn test_provider(
        &self,
        hint: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        check(cancel)?;
        let config = self.config(&self.scope(hint))?;
        let entry = config
            .providers
            .get(name)
            .ok_or_else(|| MemError::NotFound(format!("provider {}", name)))?;

        let provider = HttpProvider::from_config(name, entry)?;
        provider.complete(TEST_PROMPT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::service::testing::Fixture;

    fn ollama() -> ProviderConfig {
        ProviderConfig {
            api_key: None,
            base_url: None,
            model: "llama3".into(),
        }
    }

    #[test]
    fn test_add_list_default_remove() {
        let fx = Fixture::new();
        let s = &fx.service;

        assert!(s.providers("", &fx.cancel).unwrap().is_empty());

        s.add_provider("", "ollama", ollama(), &fx.cancel).unwrap();
        s.set_default_provider("", "ollama", &fx.cancel).unwrap();

        let listed = s.providers("", &fx.cancel).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "ollama");
        assert_eq!(listed[0].model, "llama3");
        assert!(listed[0].is_default);

        s.remove_provider("", "ollama", &fx.cancel).unwrap();
        let config = Config::load_from(&s.scope("").config_path()).unwrap();
        assert!(config.providers.is_empty());
        assert_eq!(config.default_provider, None);
    }

    #[test]
    fn test_unknown_provider() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.service.set_default_provider("", "ghost", &fx.cancel),
            Err(MemError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.remove_provider("", "ghost", &fx.cancel),
            Err(MemError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_rejects_incomplete_provider() {
        let fx = Fixture::new();
        let custom = ProviderConfig {
            model: "m".into(),
            ..Default::default()
        };
        assert!(matches!(
            fx.service.add_provider("", "custom", custom, &fx.cancel),
            Err(MemError::Config(_))
        ));
    }

    #[test]
    fn test_requires_initialized_scope() {
        let fx = Fixture::bare();
        assert!(matches!(
            fx.service.add_provider("", "ollama", ollama(), &fx.cancel),
            Err(MemError::NotInitialized(_))
        ));
    }
}

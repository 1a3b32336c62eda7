//! Registry of provider adapters.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ArxivSource, CoreSource, PubMedSource, Source, SourceError};
use crate::config::Config;
use crate::models::SourceType;
use crate::utils::HttpClient;

/// Registry for the provider adapters
///
/// Holds at most one adapter per [`SourceType`]. Every adapter built by
/// [`SourceRegistry::from_config`] shares one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: HashMap<SourceType, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create the arXiv, PubMed and CORE adapters from configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http)?;
        let endpoints = &config.endpoints;

        let mut registry = Self::empty();

        registry.register(Arc::new(
            ArxivSource::new(client.clone()).with_api_url(endpoints.arxiv.clone()),
        ));
        registry.register(Arc::new(
            PubMedSource::new(client.clone())
                .with_endpoints(endpoints.pubmed_search.clone(), endpoints.pubmed_fetch.clone())
                .with_api_key(config.api_keys.pubmed.clone()),
        ));
        registry.register(Arc::new(
            CoreSource::new(client)
                .with_api_url(endpoints.core.clone())
                .with_api_key(config.api_keys.core.clone()),
        ));

        Ok(registry)
    }

    /// Create a registry with no adapters
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Register a source, replacing any adapter for the same provider
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.source_type(), source);
    }

    /// Get the adapter for a provider
    pub fn get(&self, source_type: SourceType) -> Option<&Arc<dyn Source>> {
        self.sources.get(&source_type)
    }

    /// Get all registered sources, in merge priority order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        SourceType::ALL
            .iter()
            .filter_map(move |source_type| self.sources.get(source_type))
    }

    /// Check if a provider has an adapter
    pub fn has(&self, source_type: SourceType) -> bool {
        self.sources.contains_key(&source_type)
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    #[test]
    fn test_registry_from_config() {
        let registry = SourceRegistry::from_config(&Config::default()).unwrap();

        assert_eq!(registry.len(), 3);
        for source_type in SourceType::ALL {
            assert!(registry.has(source_type), "{} should be registered", source_type);
        }
    }

    #[test]
    fn test_get_source() {
        let registry = SourceRegistry::from_config(&Config::default()).unwrap();

        let arxiv = registry.get(SourceType::Arxiv).unwrap();
        assert_eq!(arxiv.id(), "arxiv");
        assert_eq!(arxiv.name(), "arXiv");
        assert!(arxiv.is_configured());

        assert!(SourceRegistry::empty().get(SourceType::Arxiv).is_none());
    }

    #[test]
    fn test_core_configured_from_config_key() {
        let mut config = Config::default();
        config.api_keys.core = Some("key".to_string());
        let registry = SourceRegistry::from_config(&config).unwrap();
        assert!(registry.get(SourceType::Core).unwrap().is_configured());

        config.api_keys.core = None;
        let registry = SourceRegistry::from_config(&config).unwrap();
        assert!(!registry.get(SourceType::Core).unwrap().is_configured());
    }

    #[test]
    fn test_all_in_priority_order() {
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(MockSource::new(SourceType::Core)));
        registry.register(Arc::new(MockSource::new(SourceType::Arxiv)));
        registry.register(Arc::new(MockSource::new(SourceType::PubMed)));

        let order: Vec<SourceType> = registry.all().map(|s| s.source_type()).collect();
        assert_eq!(order, SourceType::ALL.to_vec());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(MockSource::new(SourceType::Arxiv)));
        registry.register(Arc::new(MockSource::new(SourceType::Arxiv)));
        assert_eq!(registry.len(), 1);
    }
}

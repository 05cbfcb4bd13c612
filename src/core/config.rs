use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Capacity limits for the provider caches. `None` keeps entries for the
/// lifetime of the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub max_raw_documents: Option<u64>,
    pub max_resolved_schemas: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Longest `$ref` -> `$ref` substitution chain accepted for one node.
    pub max_ref_chain: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Run every rule and collect every failure.
    #[default]
    ReportAll,
    /// Stop at the first failure.
    FailFast,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_ref_chain: 32 }
    }
}

impl ProviderConfig {
    pub fn with_cache_config(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_resolver_config(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

impl CacheConfig {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(max_raw_documents: u64, max_resolved_schemas: u64) -> Self {
        Self {
            max_raw_documents: Some(max_raw_documents),
            max_resolved_schemas: Some(max_resolved_schemas),
        }
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationMode::ReportAll => write!(f, "report-all"),
            ValidationMode::FailFast => write!(f, "fail-fast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.cache.max_raw_documents, None);
        assert_eq!(config.cache.max_resolved_schemas, None);
        assert_eq!(config.resolver.max_ref_chain, 32);
        assert_eq!(ValidationMode::default(), ValidationMode::ReportAll);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"cache": {"max_raw_documents": 10, "max_resolved_schemas": null}}"#)
                .unwrap();
        assert_eq!(config.cache.max_raw_documents, Some(10));
        assert_eq!(config.resolver, ResolverConfig::default());

        let mode: ValidationMode = serde_json::from_str("\"fail-fast\"").unwrap();
        assert_eq!(mode, ValidationMode::FailFast);
        assert_eq!(mode.to_string(), "fail-fast");
    }
}

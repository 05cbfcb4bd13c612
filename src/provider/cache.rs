use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;

use super::fetcher::SchemaFetcher;
use crate::core::{CacheConfig, ProviderConfig};
use crate::error::Result;
use crate::resolver::SchemaResolver;
use crate::types::{SchemaNode, Uri};
use crate::utils::resolve_pointer;

struct ProviderInner {
    transport: Arc<dyn SchemaFetcher>,
    raw_documents: Cache<String, Arc<Value>>,
    resolved: Cache<String, Arc<SchemaNode>>,
    config: ProviderConfig,
}

/// Fetches, caches and resolves schemas.
///
/// Raw documents are cached by their fragment-less URI, resolved schemas by
/// the full URI including the fragment. Concurrent requests for the same key
/// share one in-flight fetch or resolution, and failures are never cached.
#[derive(Clone)]
pub struct SchemaProvider {
    inner: Arc<ProviderInner>,
}

/// Statistics about the provider caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub raw_documents: u64,
    pub resolved_schemas: u64,
}

fn build_cache<V>(capacity: Option<u64>) -> Cache<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    let builder = Cache::<String, V>::builder();
    match capacity {
        Some(max) => builder.max_capacity(max).build(),
        None => builder.build(),
    }
}

impl SchemaProvider {
    pub fn new(transport: Arc<dyn SchemaFetcher>) -> Self {
        Self::with_config(transport, ProviderConfig::default())
    }

    pub fn with_config(transport: Arc<dyn SchemaFetcher>, config: ProviderConfig) -> Self {
        let CacheConfig {
            max_raw_documents,
            max_resolved_schemas,
        } = config.cache;

        Self {
            inner: Arc::new(ProviderInner {
                transport,
                raw_documents: build_cache(max_raw_documents),
                resolved: build_cache(max_resolved_schemas),
                config,
            }),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    /// Resolver that fetches `$ref` targets through this provider.
    pub fn resolver(&self) -> SchemaResolver {
        SchemaResolver::new(Arc::new(self.clone())).with_config(self.inner.config.resolver.clone())
    }

    /// Fetch the document at `uri` and return a copy of the value its
    /// fragment points at.
    pub async fn fetch(&self, uri: &str) -> Result<Value> {
        let (document_uri, fragment) = match uri.split_once('#') {
            Some((document, fragment)) => (document, fragment),
            None => (uri, ""),
        };
        let document = self.raw_document(document_uri).await?;
        resolve_pointer(&document, fragment, uri).cloned()
    }

    async fn raw_document(&self, document_uri: &str) -> Result<Arc<Value>> {
        let key = Uri::parse(document_uri).to_string();
        if let Some(document) = self.inner.raw_documents.get(&key).await {
            tracing::debug!(uri = %key, "raw schema cache hit");
            return Ok(document);
        }

        let transport = Arc::clone(&self.inner.transport);
        self.inner
            .raw_documents
            .try_get_with(key.clone(), async move {
                tracing::debug!(uri = %key, "fetching raw schema");
                transport.fetch(&key).await.map(Arc::new)
            })
            .await
            .map_err(|error| (*error).clone())
    }

    /// Load and resolve the schema at `uri`, relative to `base` when given.
    pub async fn load(&self, uri: &str, base: Option<&str>) -> Result<Arc<SchemaNode>> {
        let target = match base {
            Some(base) => Uri::parse_with_base(uri, base),
            None => Uri::parse(uri),
        }
        .to_string();

        if let Some(node) = self.inner.resolved.get(&target).await {
            tracing::debug!(uri = %target, "resolved schema cache hit");
            return Ok(node);
        }

        let provider = self.clone();
        let key = target.clone();
        self.inner
            .resolved
            .try_get_with(target, async move {
                tracing::debug!(uri = %key, "resolving schema for cache");
                let raw = provider.fetch(&key).await?;
                provider.resolver().resolve(raw, &key).await
            })
            .await
            .map_err(|error| (*error).clone())
    }

    /// Load several schemas concurrently, failing on the first error.
    pub async fn load_all(&self, uris: &[&str]) -> Result<Vec<Arc<SchemaNode>>> {
        futures::future::try_join_all(uris.iter().map(|uri| self.load(uri, None))).await
    }

    /// Seed the raw document cache, e.g. with schemas bundled in the binary.
    pub async fn preload(&self, uri: &str, document: Value) {
        let key = Uri::parse(uri).without_fragment().to_string();
        self.inner.raw_documents.insert(key, Arc::new(document)).await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.inner.raw_documents.run_pending_tasks().await;
        self.inner.resolved.run_pending_tasks().await;
        CacheStats {
            raw_documents: self.inner.raw_documents.entry_count(),
            resolved_schemas: self.inner.resolved.entry_count(),
        }
    }

    pub fn clear(&self) {
        self.inner.raw_documents.invalidate_all();
        self.inner.resolved.invalidate_all();
    }
}

impl std::fmt::Debug for SchemaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaProvider")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SchemaFetcher for SchemaProvider {
    async fn fetch(&self, uri: &str) -> Result<Value> {
        SchemaProvider::fetch(self, uri).await
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::types::Uri;

/// Transport that returns the JSON document stored at an absolute URI.
///
/// The resolver calls this for every `$ref` target. Implementations decide
/// how to reach the document; retries belong here too.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Value>;
}

/// In-memory documents keyed by URI.
#[derive(Default)]
pub struct MemoryFetcher {
    documents: papaya::HashMap<String, Value>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, uri: &str, document: Value) -> Self {
        self.insert(uri, document);
        self
    }

    /// Store `document` under the fragment-less form of `uri`.
    pub fn insert(&self, uri: &str, document: Value) {
        let key = document_key(uri);
        self.documents.pin().insert(key, document);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.documents.pin().contains_key(&document_key(uri))
    }

    /// Number of `fetch` calls served so far, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn document_key(uri: &str) -> String {
    Uri::parse(uri).without_fragment().to_string()
}

#[async_trait]
impl SchemaFetcher for MemoryFetcher {
    async fn fetch(&self, uri: &str) -> Result<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let key = document_key(uri);
        self.documents
            .pin()
            .get(&key)
            .cloned()
            .ok_or_else(|| SchemaError::fetch(uri, "no document registered for this URI"))
    }
}

/// Reads `file://` URIs, or paths relative to a root directory.
#[cfg(feature = "fs-fetcher")]
#[derive(Debug, Clone, Default)]
pub struct FileSystemFetcher {
    root: Option<std::path::PathBuf>,
}

#[cfg(feature = "fs-fetcher")]
impl FileSystemFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve URIs without a scheme relative to `root`.
    pub fn with_root(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, uri: &str) -> Result<std::path::PathBuf> {
        if uri.starts_with("file:") {
            let url = url::Url::parse(uri).map_err(|e| SchemaError::fetch(uri, e.to_string()))?;
            return url
                .to_file_path()
                .map_err(|_| SchemaError::fetch(uri, "not a local file path"));
        }

        let relative = Uri::parse(uri).without_fragment().to_string();
        Ok(match &self.root {
            Some(root) => root.join(relative.trim_start_matches('/')),
            None => std::path::PathBuf::from(relative),
        })
    }
}

#[cfg(feature = "fs-fetcher")]
#[async_trait]
impl SchemaFetcher for FileSystemFetcher {
    async fn fetch(&self, uri: &str) -> Result<Value> {
        let path = self.path_for(uri)?;
        tracing::debug!(%uri, path = %path.display(), "reading schema file");

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SchemaError::fetch(uri, format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text).map_err(|e| SchemaError::fetch(uri, format!("invalid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_fetcher_ignores_fragment() {
        let fetcher = MemoryFetcher::new().with_document("http://h/s.json", json!({"type": "string"}));
        assert!(fetcher.contains("http://h/s.json#/x"));

        let doc = fetcher.fetch("http://h/s.json").await.unwrap();
        assert_eq!(doc, json!({"type": "string"}));

        let err = fetcher.fetch("http://h/missing.json").await.unwrap_err();
        assert!(matches!(err, SchemaError::Fetch { .. }));
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[cfg(feature = "fs-fetcher")]
    #[tokio::test]
    async fn test_file_system_fetcher_reads_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.json");
        std::fs::write(&path, r#"{"type": "object"}"#).unwrap();

        let uri = url::Url::from_file_path(&path).unwrap().to_string();
        let doc = FileSystemFetcher::new().fetch(&uri).await.unwrap();
        assert_eq!(doc, json!({"type": "object"}));

        let relative = FileSystemFetcher::with_root(dir.path());
        assert_eq!(relative.fetch("person.json").await.unwrap(), json!({"type": "object"}));
        assert!(matches!(
            relative.fetch("absent.json").await,
            Err(SchemaError::Fetch { .. })
        ));
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jsonschema_resolver::*;
use serde_json::{Value, json};

pub const PERSON_URI: &str = "http://example.com/schemas/person.json";

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[allow(dead_code)]
pub fn person_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "minLength": 1, "required": true},
            "age": {"type": "integer", "minimum": 0},
            "email": {"type": "string", "pattern": "^[^@]+@[^@]+$"},
            "address": {"$ref": "#/definitions/address"},
            "tags": {"type": "array", "items": {"type": "string"}, "uniqueItems": true}
        },
        "additionalProperties": false,
        "definitions": {
            "address": {
                "type": "object",
                "properties": {
                    "street": {"type": "string", "required": true},
                    "city": {"type": "string"}
                }
            }
        }
    })
}

/// Resolve `raw` as if it had been fetched from `uri`.
#[allow(dead_code)]
pub async fn resolve_at(uri: &str, raw: Value) -> Result<Arc<SchemaNode>> {
    let fetcher = Arc::new(MemoryFetcher::new().with_document(uri, raw));
    SchemaProvider::new(fetcher).load(uri, None).await
}

/// Resolve a standalone schema that has no external references.
#[allow(dead_code)]
pub async fn resolve_inline(raw: Value) -> Arc<SchemaNode> {
    resolve_at("http://example.com/inline.json", raw)
        .await
        .expect("inline schema should resolve")
}

/// Transport that answers after a delay and counts every call.
#[allow(dead_code)]
pub struct SlowFetcher {
    inner: MemoryFetcher,
    delay: Duration,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl SlowFetcher {
    pub fn new(inner: MemoryFetcher, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaFetcher for SlowFetcher {
    async fn fetch(&self, uri: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(uri).await
    }
}

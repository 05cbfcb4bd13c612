//! Schema resolution.
//!
//! Turns raw schema documents into [`SchemaNode`] trees. `$ref` is followed
//! before anything else and replaces the node's keywords with the fetched
//! document. Every recognized keyword is then normalized; nested schemas
//! resolve on their own tasks and a [`CompletionBarrier`] joins them.

mod keywords;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_recursion::async_recursion;
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::core::{CompletionBarrier, ResolverConfig};
use crate::error::{Result, SchemaError};
use crate::provider::SchemaFetcher;
use crate::types::{KEYWORDS, Keyword, KeywordValue, LinkSlot, SchemaNode, Uri, resolve_uri};
use keywords::{ChildSlot, KeywordContext, resolve_keyword};

/// Resolves raw schemas, fetching `$ref` targets through a [`SchemaFetcher`].
#[derive(Clone)]
pub struct SchemaResolver {
    fetcher: Arc<dyn SchemaFetcher>,
    config: ResolverConfig,
}

/// Schemas still being resolved above the current node, keyed by every URI
/// they are known under.
#[derive(Clone, Default)]
pub(crate) struct RefScope {
    entries: Arc<Vec<(String, LinkSlot)>>,
}

impl RefScope {
    fn find(&self, uri: &str) -> Option<LinkSlot> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key == uri)
            .map(|(_, slot)| Arc::clone(slot))
    }

    fn with(&self, keys: &[String], slot: &LinkSlot) -> RefScope {
        let mut entries = Vec::with_capacity(self.entries.len() + keys.len());
        entries.extend(self.entries.iter().cloned());
        entries.extend(keys.iter().map(|key| (key.clone(), Arc::clone(slot))));
        RefScope {
            entries: Arc::new(entries),
        }
    }
}

pub(crate) struct NodeRequest {
    pub raw: Value,
    /// URI relative `$ref` and `id` values resolve against.
    pub base_id: String,
    /// URI the raw value was loaded from, for document roots.
    pub identity: Option<String>,
    pub parent_id: Option<String>,
    pub scope: RefScope,
}

impl SchemaResolver {
    pub fn new(fetcher: Arc<dyn SchemaFetcher>) -> Self {
        Self {
            fetcher,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `raw` as the document found at `base_id`.
    pub async fn resolve(&self, raw: Value, base_id: &str) -> Result<Arc<SchemaNode>> {
        let base = Uri::parse(base_id).to_string();
        tracing::debug!(uri = %base, "resolving schema");

        let request = NodeRequest {
            raw,
            base_id: base.clone(),
            identity: Some(base),
            parent_id: None,
            scope: RefScope::default(),
        };

        resolve_node(self.clone(), request).await.inspect_err(|error| {
            tracing::warn!(uri = %base_id, %error, "schema resolution failed");
        })
    }
}

#[async_recursion]
pub(crate) async fn resolve_node(resolver: SchemaResolver, request: NodeRequest) -> Result<Arc<SchemaNode>> {
    let NodeRequest {
        mut raw,
        mut base_id,
        identity,
        parent_id,
        scope,
    } = request;

    // URIs this node has been reached through, in substitution order.
    let mut chain: Vec<String> = identity.into_iter().collect();
    let mut reference = None;

    while let Some(target) = raw.get("$ref") {
        let Some(target) = target.as_str() else {
            return Err(SchemaError::structure("$ref", &base_id, "must be a string"));
        };
        let uri = resolve_uri(target, &base_id);

        if chain.contains(&uri) {
            return Err(SchemaError::circular_reference(uri));
        }
        if let Some(slot) = scope.find(&uri) {
            tracing::debug!(%uri, "linking recursive $ref to ancestor");
            return Ok(Arc::new(SchemaNode::link(uri, raw, parent_id, slot)));
        }
        if chain.len() > resolver.config.max_ref_chain {
            return Err(SchemaError::structure(
                "$ref",
                &uri,
                format!("more than {} chained references", resolver.config.max_ref_chain),
            ));
        }

        tracing::debug!(%uri, "following $ref");
        raw = resolver.fetcher.fetch(&uri).await?;
        chain.push(uri.clone());
        base_id = uri.clone();
        reference = Some(uri);
    }

    let Value::Object(object) = &raw else {
        return Err(SchemaError::structure("schema", &base_id, "must be an object"));
    };

    let node_id = match object.get("id") {
        None => base_id.clone(),
        Some(Value::String(id)) => resolve_uri(id, &base_id),
        Some(_) => return Err(SchemaError::structure("id", &base_id, "must be a string")),
    };
    if node_id != base_id && !chain.contains(&node_id) {
        chain.push(node_id.clone());
    }

    let own_slot: LinkSlot = Arc::new(OnceCell::new());
    let child_scope = scope.with(&chain, &own_slot);

    let (barrier, outcome) = CompletionBarrier::channel();

    let mut ctx = KeywordContext {
        resolver: &resolver,
        object,
        node_id: &node_id,
        scope: &child_scope,
        barrier: &barrier,
        tasks: Vec::new(),
    };

    // Dropping `ctx` on an early return aborts every child task already started.
    let mut drafts = BTreeMap::new();
    for spec in KEYWORDS {
        if let Some(value) = resolve_keyword(spec, object.get(spec.name), &mut ctx)? {
            drafts.insert(spec.keyword, value);
        }
    }
    // Every keyword has registered its children.
    barrier.seal();

    outcome
        .await
        .map_err(|_| SchemaError::illegal_state("resolution barrier dropped without completing"))??;
    drop(ctx);

    let keywords = drafts
        .into_iter()
        .map(|(keyword, draft)| Ok((keyword, draft.try_map(&mut take_child)?)))
        .collect::<Result<BTreeMap<Keyword, KeywordValue>>>()?;

    let node = Arc::new(SchemaNode::resolved(node_id, raw, reference, parent_id, keywords));
    // Only this call fills the slot.
    let _ = own_slot.set(Arc::downgrade(&node));
    tracing::debug!(id = %node.id(), "schema node resolved");
    Ok(node)
}

fn take_child(slot: ChildSlot) -> Result<Arc<SchemaNode>> {
    slot.get()
        .cloned()
        .ok_or_else(|| SchemaError::illegal_state("nested schema missing after resolution"))
}

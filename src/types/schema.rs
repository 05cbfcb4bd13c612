use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;

use super::instance::SimpleType;
use super::keyword::Keyword;
use crate::error::Result;
use crate::utils::{deep_equal, unique_extend};

/// Slot a recursive `$ref` link points through. Filled with the target once
/// the target has finished resolving.
pub type LinkSlot = Arc<OnceCell<Weak<SchemaNode>>>;

pub type SchemaMap<S = Arc<SchemaNode>> = BTreeMap<String, S>;

/// A regular expression together with the source it was compiled from.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Entry of a `type` or `disallow` list.
#[derive(Debug, Clone)]
pub enum TypeEntry<S = Arc<SchemaNode>> {
    Simple(SimpleType),
    Schema(S),
}

#[derive(Debug, Clone)]
pub struct PatternSchema<S = Arc<SchemaNode>> {
    pub pattern: CompiledPattern,
    pub schema: S,
}

#[derive(Debug, Clone)]
pub enum Dependency<S = Arc<SchemaNode>> {
    /// Property names that must be present alongside the key.
    Properties(Vec<String>),
    /// Schema the whole object must satisfy when the key is present.
    Schema(S),
}

/// Normalized value of one keyword.
///
/// `S` is the child schema representation. Finished nodes use
/// `Arc<SchemaNode>`; the resolver builds drafts with pending slots.
#[derive(Debug, Clone)]
pub enum KeywordValue<S = Arc<SchemaNode>> {
    Null,
    Bool(bool),
    Number(f64),
    Count(u64),
    Text(String),
    Pattern(CompiledPattern),
    /// `enum` members.
    Values(Vec<Value>),
    /// `default`, kept as authored.
    Value(Value),
    Types(Vec<TypeEntry<S>>),
    Schema(S),
    Schemas(Vec<S>),
    Tuple(Vec<S>),
    SchemaMap(SchemaMap<S>),
    PatternSchemas(Vec<PatternSchema<S>>),
    RequiredProperties(Vec<String>),
    Dependencies(BTreeMap<String, Dependency<S>>),
}

impl<S> KeywordValue<S> {
    /// Convert every child schema with `f`, keeping the shape.
    pub fn try_map<T, F>(self, f: &mut F) -> Result<KeywordValue<T>>
    where
        F: FnMut(S) -> Result<T>,
    {
        Ok(match self {
            KeywordValue::Null => KeywordValue::Null,
            KeywordValue::Bool(b) => KeywordValue::Bool(b),
            KeywordValue::Number(n) => KeywordValue::Number(n),
            KeywordValue::Count(n) => KeywordValue::Count(n),
            KeywordValue::Text(s) => KeywordValue::Text(s),
            KeywordValue::Pattern(p) => KeywordValue::Pattern(p),
            KeywordValue::Values(v) => KeywordValue::Values(v),
            KeywordValue::Value(v) => KeywordValue::Value(v),
            KeywordValue::RequiredProperties(names) => KeywordValue::RequiredProperties(names),
            KeywordValue::Types(entries) => KeywordValue::Types(
                entries
                    .into_iter()
                    .map(|entry| match entry {
                        TypeEntry::Simple(simple) => Ok(TypeEntry::Simple(simple)),
                        TypeEntry::Schema(schema) => f(schema).map(TypeEntry::Schema),
                    })
                    .collect::<Result<_>>()?,
            ),
            KeywordValue::Schema(schema) => KeywordValue::Schema(f(schema)?),
            KeywordValue::Schemas(schemas) => {
                KeywordValue::Schemas(schemas.into_iter().map(&mut *f).collect::<Result<_>>()?)
            }
            KeywordValue::Tuple(schemas) => {
                KeywordValue::Tuple(schemas.into_iter().map(&mut *f).collect::<Result<_>>()?)
            }
            KeywordValue::SchemaMap(map) => KeywordValue::SchemaMap(
                map.into_iter()
                    .map(|(name, schema)| Ok((name, f(schema)?)))
                    .collect::<Result<_>>()?,
            ),
            KeywordValue::PatternSchemas(entries) => KeywordValue::PatternSchemas(
                entries
                    .into_iter()
                    .map(|entry| {
                        Ok(PatternSchema {
                            pattern: entry.pattern,
                            schema: f(entry.schema)?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            KeywordValue::Dependencies(map) => KeywordValue::Dependencies(
                map.into_iter()
                    .map(|(name, dependency)| {
                        let dependency = match dependency {
                            Dependency::Properties(names) => Dependency::Properties(names),
                            Dependency::Schema(schema) => Dependency::Schema(f(schema)?),
                        };
                        Ok((name, dependency))
                    })
                    .collect::<Result<_>>()?,
            ),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, KeywordValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            KeywordValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            KeywordValue::Number(n) => Some(*n),
            KeywordValue::Count(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            KeywordValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeywordValue::Text(s) => Some(s),
            KeywordValue::Pattern(p) => Some(p.source()),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&S> {
        match self {
            KeywordValue::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn as_schemas(&self) -> Option<&[S]> {
        match self {
            KeywordValue::Schemas(schemas) | KeywordValue::Tuple(schemas) => Some(schemas),
            _ => None,
        }
    }

    pub fn as_schema_map(&self) -> Option<&SchemaMap<S>> {
        match self {
            KeywordValue::SchemaMap(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_types(&self) -> Option<&[TypeEntry<S>]> {
        match self {
            KeywordValue::Types(entries) => Some(entries),
            _ => None,
        }
    }
}

enum NodeBody {
    Resolved(BTreeMap<Keyword, KeywordValue>),
    Link(LinkSlot),
}

/// A resolved schema or sub-schema.
///
/// Immutable once built. The only interior state is the lazily computed
/// [`MergedKeywords`] view.
pub struct SchemaNode {
    id: String,
    raw: Value,
    reference: Option<String>,
    parent_id: Option<String>,
    body: NodeBody,
    merged: OnceCell<MergedKeywords>,
}

impl SchemaNode {
    pub(crate) fn resolved(
        id: String,
        raw: Value,
        reference: Option<String>,
        parent_id: Option<String>,
        keywords: BTreeMap<Keyword, KeywordValue>,
    ) -> Self {
        Self {
            id,
            raw,
            reference,
            parent_id,
            body: NodeBody::Resolved(keywords),
            merged: OnceCell::new(),
        }
    }

    /// Node standing in for an ancestor that was still being resolved when a
    /// `$ref` pointed back at it.
    pub(crate) fn link(target_id: String, raw: Value, parent_id: Option<String>, slot: LinkSlot) -> Self {
        Self {
            id: target_id.clone(),
            raw,
            reference: Some(target_id),
            parent_id,
            body: NodeBody::Link(slot),
            merged: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The schema as authored, or the fetched document when reached through `$ref`.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Absolute `$ref` URI this node was substituted from.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn is_recursive_link(&self) -> bool {
        matches!(self.body, NodeBody::Link(_))
    }

    /// Node that carries the keywords: `self` for ordinary nodes, the
    /// ancestor for a recursive link. `None` when the link target is gone.
    pub fn follow(self: &Arc<Self>) -> Option<Arc<SchemaNode>> {
        match &self.body {
            NodeBody::Resolved(_) => Some(Arc::clone(self)),
            NodeBody::Link(slot) => slot.get().and_then(Weak::upgrade),
        }
    }

    /// Keyword value; link nodes carry no keywords of their own.
    pub fn keyword(&self, keyword: Keyword) -> Option<&KeywordValue> {
        match &self.body {
            NodeBody::Resolved(keywords) => keywords.get(&keyword),
            NodeBody::Link(_) => None,
        }
    }

    /// Resolved keywords in registry order.
    pub fn keywords(&self) -> impl Iterator<Item = (Keyword, &KeywordValue)> {
        let keywords = match &self.body {
            NodeBody::Resolved(keywords) => Some(keywords),
            NodeBody::Link(_) => None,
        };
        keywords
            .into_iter()
            .flat_map(|map| map.iter().map(|(keyword, value)| (*keyword, value)))
    }

    pub fn types(&self) -> Option<&[TypeEntry]> {
        self.keyword(Keyword::Type).and_then(KeywordValue::as_types)
    }

    pub fn disallowed(&self) -> Option<&[TypeEntry]> {
        self.keyword(Keyword::Disallow).and_then(KeywordValue::as_types)
    }

    pub fn properties(&self) -> Option<&SchemaMap> {
        self.keyword(Keyword::Properties).and_then(KeywordValue::as_schema_map)
    }

    pub fn property(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.properties().and_then(|map| map.get(name))
    }

    pub fn pattern_properties(&self) -> &[PatternSchema] {
        match self.keyword(Keyword::PatternProperties) {
            Some(KeywordValue::PatternSchemas(entries)) => entries,
            _ => &[],
        }
    }

    pub fn definitions(&self) -> Option<&SchemaMap> {
        self.keyword(Keyword::Definitions).and_then(KeywordValue::as_schema_map)
    }

    pub fn definition(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.definitions().and_then(|map| map.get(name))
    }

    pub fn items(&self) -> Option<&KeywordValue> {
        self.keyword(Keyword::Items)
    }

    pub fn extends(&self) -> &[Arc<SchemaNode>] {
        self.keyword(Keyword::Extends)
            .and_then(KeywordValue::as_schemas)
            .unwrap_or(&[])
    }

    pub fn default_value(&self) -> Option<&Value> {
        match self.keyword(Keyword::Default) {
            Some(KeywordValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn text(&self, keyword: Keyword) -> Option<&str> {
        self.keyword(keyword).and_then(KeywordValue::as_str)
    }

    pub fn number(&self, keyword: Keyword) -> Option<f64> {
        self.keyword(keyword).and_then(KeywordValue::as_number)
    }

    pub fn count(&self, keyword: Keyword) -> Option<u64> {
        self.keyword(keyword).and_then(KeywordValue::as_count)
    }

    /// Boolean keyword, `false` when absent.
    pub fn flag(&self, keyword: Keyword) -> bool {
        self.keyword(keyword)
            .and_then(KeywordValue::as_bool)
            .unwrap_or(false)
    }

    /// Keywords merged along the `extends` chain, computed on first use.
    pub fn merged(&self) -> &MergedKeywords {
        self.merged.get_or_init(|| MergedKeywords::collect(self))
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("SchemaNode");
        out.field("id", &self.id)
            .field("reference", &self.reference)
            .field("parent_id", &self.parent_id);
        match &self.body {
            NodeBody::Resolved(keywords) => out.field("keywords", &keywords.keys().collect::<Vec<_>>()),
            NodeBody::Link(slot) => out.field("link_ready", &slot.get().is_some()),
        };
        out.finish()
    }
}

/// Keyword values inherited along the `extends` chain.
///
/// The chain is walked depth first starting with the node itself, each
/// schema visited once. Scalars take the nearest defined value, bounds take
/// the tightest value, flags are OR-ed, `enum` and `type` are unions and
/// property collections let the nearest schema win.
#[derive(Debug, Clone, Default)]
pub struct MergedKeywords {
    pub types: Vec<TypeEntry>,
    pub enum_values: Option<Vec<Value>>,
    pub default: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub required: bool,
    pub required_properties: Vec<String>,
    pub unique_items: bool,
    pub properties: SchemaMap,
}

impl MergedKeywords {
    fn collect(node: &SchemaNode) -> Self {
        let mut chain = Vec::new();
        let mut seen: Vec<*const SchemaNode> = vec![node as *const SchemaNode];
        collect_extends(node, &mut chain, &mut seen);

        let mut merged = MergedKeywords::default();
        merged.absorb(node);
        for ancestor in &chain {
            merged.absorb(ancestor);
        }
        merged
    }

    fn absorb(&mut self, node: &SchemaNode) {
        if self.default.is_none() {
            self.default = node.default_value().cloned();
        }
        fill(&mut self.title, node.text(Keyword::Title));
        fill(&mut self.description, node.text(Keyword::Description));
        fill(&mut self.format, node.text(Keyword::Format));
        fill(&mut self.pattern, node.text(Keyword::Pattern));

        tighten(&mut self.minimum, node.number(Keyword::Minimum), f64::max);
        tighten(&mut self.maximum, node.number(Keyword::Maximum), f64::min);
        tighten(&mut self.min_length, node.count(Keyword::MinLength), u64::max);
        tighten(&mut self.max_length, node.count(Keyword::MaxLength), u64::min);
        tighten(&mut self.min_items, node.count(Keyword::MinItems), u64::max);
        tighten(&mut self.max_items, node.count(Keyword::MaxItems), u64::min);

        self.exclusive_minimum |= node.flag(Keyword::ExclusiveMinimum);
        self.exclusive_maximum |= node.flag(Keyword::ExclusiveMaximum);
        self.unique_items |= node.flag(Keyword::UniqueItems);
        match node.keyword(Keyword::Required) {
            Some(KeywordValue::Bool(required)) => self.required |= *required,
            Some(KeywordValue::RequiredProperties(names)) => {
                for name in names {
                    if !self.required_properties.contains(name) {
                        self.required_properties.push(name.clone());
                    }
                }
            }
            _ => {}
        }

        if let Some(KeywordValue::Values(values)) = node.keyword(Keyword::Enum) {
            unique_extend(self.enum_values.get_or_insert_with(Vec::new), values.iter().cloned());
        }

        for entry in node.types().unwrap_or(&[]) {
            if !self.types.iter().any(|existing| same_type_entry(existing, entry)) {
                self.types.push(entry.clone());
            }
        }

        for (name, schema) in node.properties().into_iter().flatten() {
            self.properties
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(schema));
        }
    }
}

fn collect_extends(node: &SchemaNode, chain: &mut Vec<Arc<SchemaNode>>, seen: &mut Vec<*const SchemaNode>) {
    for extended in node.extends() {
        let Some(target) = extended.follow() else {
            continue;
        };
        let ptr = Arc::as_ptr(&target);
        if seen.contains(&ptr) {
            continue;
        }
        seen.push(ptr);
        chain.push(Arc::clone(&target));
        collect_extends(&target, chain, seen);
    }
}

fn fill(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        *slot = value.map(str::to_string);
    }
}

fn tighten<T: Copy>(slot: &mut Option<T>, value: Option<T>, pick: fn(T, T) -> T) {
    *slot = match (*slot, value) {
        (Some(current), Some(value)) => Some(pick(current, value)),
        (current, value) => current.or(value),
    };
}

fn same_type_entry(a: &TypeEntry, b: &TypeEntry) -> bool {
    match (a, b) {
        (TypeEntry::Simple(x), TypeEntry::Simple(y)) => x == y,
        (TypeEntry::Schema(x), TypeEntry::Schema(y)) => Arc::ptr_eq(x, y) || deep_equal(x.raw(), y.raw()),
        _ => false,
    }
}

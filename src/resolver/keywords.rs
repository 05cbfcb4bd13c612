//! Per-keyword normalization.
//!
//! Each [`ResolveKind`] turns the raw keyword value into a [`KeywordValue`]
//! draft. Nested schemas are handed to [`KeywordContext::child`], which
//! starts their resolution and returns the slot the finished node lands in.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use super::{NodeRequest, RefScope, SchemaResolver, resolve_node};
use crate::core::CompletionBarrier;
use crate::error::{Result, SchemaError};
use crate::types::{
    CompiledPattern, Dependency, Keyword, KeywordSpec, KeywordValue, PatternSchema, ResolveKind,
    SchemaNode, SimpleType, TypeEntry,
};
use crate::utils::unique_extend;

/// Slot a child schema is written to once its resolution task finishes.
pub(crate) type ChildSlot = Arc<OnceCell<Arc<SchemaNode>>>;

pub(crate) type DraftValue = KeywordValue<ChildSlot>;

pub(crate) struct KeywordContext<'a> {
    pub resolver: &'a SchemaResolver,
    pub object: &'a Map<String, Value>,
    pub node_id: &'a str,
    pub scope: &'a RefScope,
    pub barrier: &'a CompletionBarrier,
    pub tasks: Vec<JoinHandle<()>>,
}

impl KeywordContext<'_> {
    fn error(&self, keyword: Keyword, message: impl Into<String>) -> SchemaError {
        SchemaError::structure(keyword.name(), self.node_id, message)
    }

    /// Start resolving a nested schema on its own task.
    fn child(&mut self, raw: &Value) -> Result<ChildSlot> {
        let job = self.barrier.register_job()?;
        let slot: ChildSlot = Arc::new(OnceCell::new());

        let request = NodeRequest {
            raw: raw.clone(),
            base_id: self.node_id.to_string(),
            identity: None,
            parent_id: Some(self.node_id.to_string()),
            scope: self.scope.clone(),
        };
        let resolver = self.resolver.clone();
        let filled = Arc::clone(&slot);

        self.tasks.push(tokio::spawn(async move {
            match resolve_node(resolver, request).await {
                Ok(node) => {
                    // Each slot has exactly one writer.
                    let _ = filled.set(node);
                    job.succeed();
                }
                Err(error) => job.fail(error),
            }
        }));

        Ok(slot)
    }

    /// A nested value that has to be a schema object.
    fn schema(&mut self, keyword: Keyword, value: &Value, what: &str) -> Result<ChildSlot> {
        match value {
            Value::Object(_) => self.child(value),
            _ => Err(self.error(keyword, format!("{what} must be a schema object"))),
        }
    }

    fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

// An aborted resolution drops its context, which takes the whole subtree of
// child tasks down with it.
impl Drop for KeywordContext<'_> {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Normalize one keyword. `None` means the keyword gets no entry.
pub(crate) fn resolve_keyword(
    spec: &KeywordSpec,
    value: Option<&Value>,
    ctx: &mut KeywordContext<'_>,
) -> Result<Option<DraftValue>> {
    let keyword = spec.keyword;

    match spec.resolve {
        ResolveKind::Id => Ok(value.map(|_| KeywordValue::Text(ctx.node_id.to_string()))),

        ResolveKind::TypeList => value.map(|v| type_list(keyword, v, ctx)).transpose(),

        ResolveKind::ObjectOfSchemas => {
            let map = match value {
                Some(Value::Object(entries)) => schema_map(keyword, entries, ctx)?,
                _ => BTreeMap::new(),
            };
            Ok(Some(KeywordValue::SchemaMap(map)))
        }

        ResolveKind::OptionalObjectOfSchemas => match value {
            None => Ok(None),
            Some(Value::Object(entries)) => Ok(Some(KeywordValue::SchemaMap(schema_map(keyword, entries, ctx)?))),
            Some(_) => Ok(Some(KeywordValue::SchemaMap(BTreeMap::new()))),
        },

        ResolveKind::PatternSchemas => {
            let mut entries = Vec::new();
            if let Some(Value::Object(map)) = value {
                for (source, raw) in map {
                    let pattern = CompiledPattern::new(source).map_err(|e| {
                        ctx.error(keyword, format!("invalid pattern '{source}': {e}"))
                    })?;
                    let schema = ctx.schema(keyword, raw, &format!("pattern '{source}'"))?;
                    entries.push(PatternSchema { pattern, schema });
                }
            }
            Ok(Some(KeywordValue::PatternSchemas(entries)))
        }

        ResolveKind::BooleanOrSchema => Ok(Some(match value {
            None => KeywordValue::Bool(true),
            Some(raw @ Value::Object(_)) => KeywordValue::Schema(ctx.child(raw)?),
            Some(other) => KeywordValue::Bool(truthy(other)),
        })),

        ResolveKind::SchemaOrTuple => match value {
            None => Ok(None),
            Some(raw @ Value::Object(_)) => Ok(Some(KeywordValue::Schema(ctx.child(raw)?))),
            Some(Value::Array(items)) => {
                let tuple = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| ctx.schema(keyword, item, &format!("entry {index}")))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(KeywordValue::Tuple(tuple)))
            }
            Some(_) => Err(ctx.error(keyword, "must be a schema or an array of schemas")),
        },

        ResolveKind::Required => match value {
            None => Ok(Some(KeywordValue::Bool(false))),
            Some(Value::Bool(required)) => Ok(Some(KeywordValue::Bool(*required))),
            Some(Value::Array(names)) => Ok(Some(KeywordValue::RequiredProperties(
                string_list(names).ok_or_else(|| ctx.error(keyword, "must list property names as strings"))?,
            ))),
            Some(_) => Err(ctx.error(keyword, "must be a boolean or an array of property names")),
        },

        ResolveKind::Dependencies => match value {
            None => Ok(None),
            Some(Value::Object(entries)) => {
                let mut dependencies = BTreeMap::new();
                for (name, raw) in entries {
                    let dependency = match raw {
                        Value::Object(_) => Dependency::Schema(ctx.child(raw)?),
                        Value::String(property) => Dependency::Properties(vec![property.clone()]),
                        Value::Array(names) => Dependency::Properties(string_list(names).ok_or_else(|| {
                            ctx.error(keyword, format!("'{name}' must list property names as strings"))
                        })?),
                        _ => {
                            return Err(ctx.error(
                                keyword,
                                format!("'{name}' must be a schema, a property name or an array of property names"),
                            ));
                        }
                    };
                    dependencies.insert(name.clone(), dependency);
                }
                Ok(Some(KeywordValue::Dependencies(dependencies)))
            }
            Some(_) => Err(ctx.error(keyword, "must be an object")),
        },

        ResolveKind::NumberOrNull => Ok(Some(
            value
                .and_then(Value::as_f64)
                .map_or(KeywordValue::Null, KeywordValue::Number),
        )),

        ResolveKind::CountOrNull => match value.and_then(Value::as_f64) {
            None => Ok(Some(KeywordValue::Null)),
            Some(n) if n < 0.0 => Err(ctx.error(keyword, "must not be negative")),
            // Fractional bounds only admit whole counts on their inner side.
            Some(n) if is_lower_bound(keyword) => Ok(Some(KeywordValue::Count(n.ceil() as u64))),
            Some(n) => Ok(Some(KeywordValue::Count(n.floor() as u64))),
        },

        ResolveKind::PositiveNumber => match value {
            None => Ok(None),
            Some(raw) => match raw.as_f64() {
                Some(n) if n > 0.0 => Ok(Some(KeywordValue::Number(n))),
                _ => Err(ctx.error(keyword, "must be a number greater than 0")),
            },
        },

        ResolveKind::BooleanDefaultFalse => {
            let flag = match value {
                None => false,
                Some(Value::Bool(flag)) => *flag,
                Some(_) => return Err(ctx.error(keyword, "must be a boolean")),
            };
            let bound = match keyword {
                Keyword::ExclusiveMinimum => Some(Keyword::Minimum),
                Keyword::ExclusiveMaximum => Some(Keyword::Maximum),
                _ => None,
            };
            if let Some(bound) = bound {
                if flag && !ctx.object.get(bound.name()).is_some_and(Value::is_number) {
                    return Err(ctx.error(keyword, format!("requires '{bound}' to be present")));
                }
            }
            Ok(Some(KeywordValue::Bool(flag)))
        }

        ResolveKind::Pattern => match value {
            None => Ok(None),
            Some(Value::String(source)) => CompiledPattern::new(source)
                .map(|pattern| Some(KeywordValue::Pattern(pattern)))
                .map_err(|e| ctx.error(keyword, format!("invalid pattern: {e}"))),
            Some(_) => Err(ctx.error(keyword, "must be a string")),
        },

        ResolveKind::ArrayOrNull => Ok(Some(match value {
            Some(Value::Array(values)) if !values.is_empty() => KeywordValue::Values(values.clone()),
            _ => KeywordValue::Null,
        })),

        ResolveKind::Any => Ok(value.map(|v| KeywordValue::Value(v.clone()))),

        ResolveKind::StringOrNull => Ok(Some(match value {
            Some(Value::String(text)) => KeywordValue::Text(text.clone()),
            _ => KeywordValue::Null,
        })),

        ResolveKind::SchemaOrSchemas => match value {
            None => Ok(None),
            Some(raw @ Value::Object(_)) => Ok(Some(KeywordValue::Schemas(vec![ctx.child(raw)?]))),
            Some(Value::Array(items)) => Ok(Some(KeywordValue::Schemas(schema_list(keyword, items, ctx)?))),
            Some(_) => Err(ctx.error(keyword, "must be a schema or an array of schemas")),
        },

        ResolveKind::SchemaList => match value {
            None => Ok(None),
            Some(Value::Array(items)) if !items.is_empty() => {
                Ok(Some(KeywordValue::Schemas(schema_list(keyword, items, ctx)?)))
            }
            Some(_) => Err(ctx.error(keyword, "must be a non-empty array of schemas")),
        },

        ResolveKind::Schema => match value {
            None => Ok(None),
            Some(raw) => Ok(Some(KeywordValue::Schema(ctx.schema(keyword, raw, "value")?))),
        },
    }
}

fn type_list(keyword: Keyword, value: &Value, ctx: &mut KeywordContext<'_>) -> Result<DraftValue> {
    let declared = match value {
        Value::String(_) | Value::Object(_) => vec![value.clone()],
        Value::Array(items) => items.clone(),
        _ => return Err(ctx.error(keyword, "must be a type name, a schema or an array of them")),
    };

    let mut unique = Vec::new();
    unique_extend(&mut unique, declared);
    if unique.is_empty() {
        return Ok(KeywordValue::Types(vec![TypeEntry::Simple(SimpleType::Any)]));
    }

    let mut entries = Vec::with_capacity(unique.len());
    for entry in &unique {
        entries.push(match entry {
            Value::String(name) => TypeEntry::Simple(
                name.parse::<SimpleType>()
                    .map_err(|message| ctx.error(keyword, message))?,
            ),
            Value::Object(_) => TypeEntry::Schema(ctx.child(entry)?),
            _ => return Err(ctx.error(keyword, "entries must be type names or schemas")),
        });
    }
    Ok(KeywordValue::Types(entries))
}

fn schema_map(
    keyword: Keyword,
    entries: &Map<String, Value>,
    ctx: &mut KeywordContext<'_>,
) -> Result<BTreeMap<String, ChildSlot>> {
    entries
        .iter()
        .map(|(name, raw)| Ok((name.clone(), ctx.schema(keyword, raw, &format!("'{name}'"))?)))
        .collect()
}

fn schema_list(keyword: Keyword, items: &[Value], ctx: &mut KeywordContext<'_>) -> Result<Vec<ChildSlot>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| ctx.schema(keyword, item, &format!("entry {index}")))
        .collect()
}

fn is_lower_bound(keyword: Keyword) -> bool {
    matches!(keyword, Keyword::MinItems | Keyword::MinLength | Keyword::MinProperties)
}

fn string_list(values: &[Value]) -> Option<Vec<String>> {
    values
        .iter()
        .map(|value| value.as_str().map(str::to_string))
        .collect()
}

/// Truthiness used when coercing a non-schema value to a boolean.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

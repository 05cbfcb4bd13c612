use std::sync::Arc;

use serde_json::Value;

use super::ValidationContext;
use crate::types::{Dependency, InstanceType, Keyword, KeywordValue, SchemaNode, TypeEntry};
use crate::utils::{deep_equal, first_duplicate};

/// Allowed relative error when checking `multipleOf` on binary floats.
const MULTIPLE_EPSILON: f64 = 1e-9;

/// Run the rule for `keyword`. Returns whether `data` passed.
pub(super) fn check(
    ctx: &mut ValidationContext<'_>,
    node: &SchemaNode,
    keyword: Keyword,
    value: &KeywordValue,
    data: Option<&Value>,
    actual: InstanceType,
) -> bool {
    let name = keyword.name();

    match keyword {
        Keyword::Type => match value.as_types() {
            Some(entries) if actual != InstanceType::Undefined => {
                if matches_any(ctx, entries, data, actual).is_some() {
                    return true;
                }
                ctx.fail(name, format!("expected {}, found {actual}", describe(entries)));
                false
            }
            _ => true,
        },

        Keyword::Disallow => match value.as_types() {
            Some(entries) if actual != InstanceType::Undefined => match matches_any(ctx, entries, data, actual) {
                Some(index) => {
                    ctx.fail(name, format!("{actual} value matches disallowed entry {index}"));
                    false
                }
                None => true,
            },
            _ => true,
        },

        Keyword::Properties => {
            let (Some(Value::Object(object)), Some(properties)) = (data, value.as_schema_map()) else {
                return true;
            };
            let mut valid = true;
            for (property, schema) in properties {
                if ctx.should_stop() {
                    break;
                }
                valid &= ctx.nested(property, schema, object.get(property));
            }
            valid
        }

        Keyword::PatternProperties => {
            let (Some(Value::Object(object)), KeywordValue::PatternSchemas(entries)) = (data, value) else {
                return true;
            };
            let mut valid = true;
            for entry in entries {
                for (property, item) in object {
                    if ctx.should_stop() {
                        return false;
                    }
                    if entry.pattern.is_match(property) {
                        valid &= ctx.nested(property, &entry.schema, Some(item));
                    }
                }
            }
            valid
        }

        Keyword::AdditionalProperties => {
            let Some(Value::Object(object)) = data else {
                return true;
            };
            let declared = node.properties();
            let patterns = node.pattern_properties();
            let mut valid = true;

            for (property, item) in object {
                if declared.is_some_and(|map| map.contains_key(property))
                    || patterns.iter().any(|entry| entry.pattern.is_match(property))
                {
                    continue;
                }
                if ctx.should_stop() {
                    return false;
                }
                match value {
                    KeywordValue::Bool(false) => {
                        ctx.push_path(property);
                        ctx.fail(name, format!("additional property '{property}' is not allowed"));
                        ctx.pop_path();
                        valid = false;
                    }
                    KeywordValue::Schema(schema) => valid &= ctx.nested(property, schema, Some(item)),
                    _ => {}
                }
            }
            valid
        }

        Keyword::Items => {
            let Some(Value::Array(items)) = data else {
                return true;
            };
            let mut valid = true;
            match value {
                KeywordValue::Schema(schema) => {
                    for (index, item) in items.iter().enumerate() {
                        if ctx.should_stop() {
                            return false;
                        }
                        valid &= ctx.nested(&index.to_string(), schema, Some(item));
                    }
                }
                KeywordValue::Tuple(schemas) => {
                    for (index, schema) in schemas.iter().enumerate() {
                        if ctx.should_stop() {
                            return false;
                        }
                        valid &= ctx.nested(&index.to_string(), schema, items.get(index));
                    }
                }
                _ => {}
            }
            valid
        }

        Keyword::AdditionalItems => {
            let (Some(Value::Array(items)), Some(KeywordValue::Tuple(tuple))) = (data, node.items()) else {
                return true;
            };
            let mut valid = true;
            for (index, item) in items.iter().enumerate().skip(tuple.len()) {
                if ctx.should_stop() {
                    return false;
                }
                match value {
                    KeywordValue::Bool(false) => {
                        ctx.push_path(&index.to_string());
                        ctx.fail(name, format!("item {index} is beyond the {} allowed", tuple.len()));
                        ctx.pop_path();
                        valid = false;
                    }
                    KeywordValue::Schema(schema) => valid &= ctx.nested(&index.to_string(), schema, Some(item)),
                    _ => {}
                }
            }
            valid
        }

        Keyword::Required => match value {
            KeywordValue::Bool(true) if actual == InstanceType::Undefined => {
                ctx.fail(name, "value is required");
                false
            }
            KeywordValue::RequiredProperties(required) => {
                let Some(Value::Object(object)) = data else {
                    return true;
                };
                let mut valid = true;
                for property in required.iter().filter(|p| !object.contains_key(p.as_str())) {
                    ctx.push_path(property);
                    ctx.fail(name, format!("required property '{property}' is missing"));
                    ctx.pop_path();
                    valid = false;
                }
                valid
            }
            _ => true,
        },

        Keyword::Dependencies => {
            let (Some(Value::Object(object)), KeywordValue::Dependencies(dependencies)) = (data, value) else {
                return true;
            };
            let mut valid = true;
            for (property, dependency) in dependencies {
                if !object.contains_key(property) {
                    continue;
                }
                match dependency {
                    Dependency::Properties(needed) => {
                        for missing in needed.iter().filter(|n| !object.contains_key(n.as_str())) {
                            ctx.fail(name, format!("'{property}' requires property '{missing}'"));
                            valid = false;
                        }
                    }
                    Dependency::Schema(schema) => {
                        valid &= super::validate_node(ctx, schema, data);
                    }
                }
            }
            valid
        }

        Keyword::Minimum => {
            let (Some(number), Some(bound)) = (number_of(data), value.as_number()) else {
                return true;
            };
            let exclusive = node.flag(Keyword::ExclusiveMinimum);
            if (exclusive && number <= bound) || number < bound {
                let relation = if exclusive { "greater than" } else { "at least" };
                ctx.fail(name, format!("{number} is not {relation} {bound}"));
                return false;
            }
            true
        }

        Keyword::Maximum => {
            let (Some(number), Some(bound)) = (number_of(data), value.as_number()) else {
                return true;
            };
            let exclusive = node.flag(Keyword::ExclusiveMaximum);
            if (exclusive && number >= bound) || number > bound {
                let relation = if exclusive { "less than" } else { "at most" };
                ctx.fail(name, format!("{number} is not {relation} {bound}"));
                return false;
            }
            true
        }

        Keyword::MinItems | Keyword::MaxItems => match data {
            Some(Value::Array(items)) => check_count(ctx, keyword, value, items.len(), "items"),
            _ => true,
        },

        Keyword::MinLength | Keyword::MaxLength => match data {
            Some(Value::String(text)) => check_count(ctx, keyword, value, text.chars().count(), "characters"),
            _ => true,
        },

        Keyword::MinProperties | Keyword::MaxProperties => match data {
            Some(Value::Object(object)) => check_count(ctx, keyword, value, object.len(), "properties"),
            _ => true,
        },

        Keyword::UniqueItems => {
            let (Some(Value::Array(items)), KeywordValue::Bool(true)) = (data, value) else {
                return true;
            };
            match first_duplicate(items) {
                Some(index) => {
                    ctx.fail(name, format!("duplicate item at index {index}"));
                    false
                }
                None => true,
            }
        }

        Keyword::Pattern => {
            let (Some(Value::String(text)), KeywordValue::Pattern(pattern)) = (data, value) else {
                return true;
            };
            if pattern.is_match(text) {
                return true;
            }
            ctx.fail(name, format!("'{text}' does not match /{}/", pattern.source()));
            false
        }

        Keyword::Enum => {
            let (Some(item), KeywordValue::Values(allowed)) = (data, value) else {
                return true;
            };
            if allowed.iter().any(|candidate| deep_equal(candidate, item)) {
                return true;
            }
            ctx.fail(name, format!("{item} is not one of the allowed values"));
            false
        }

        Keyword::MultipleOf | Keyword::DivisibleBy => {
            let (Some(number), Some(divisor)) = (number_of(data), value.as_number()) else {
                return true;
            };
            let quotient = number / divisor;
            // A divisor too small for the quotient to be represented divides every finite number.
            if !quotient.is_finite() && number.is_finite() {
                return true;
            }
            if (quotient - quotient.round()).abs() <= MULTIPLE_EPSILON * quotient.abs().max(1.0) {
                return true;
            }
            ctx.fail(name, format!("{number} is not a multiple of {divisor}"));
            false
        }

        Keyword::Extends | Keyword::AllOf => {
            let Some(schemas) = value.as_schemas() else {
                return true;
            };
            let mut valid = true;
            for schema in schemas {
                if ctx.should_stop() {
                    return false;
                }
                valid &= super::validate_node(ctx, schema, data);
            }
            valid
        }

        Keyword::AnyOf => {
            let Some(schemas) = value.as_schemas() else {
                return true;
            };
            if actual == InstanceType::Undefined || schemas.iter().any(|schema| ctx.probe(schema, data)) {
                return true;
            }
            ctx.fail(name, format!("value matches none of the {} schemas", schemas.len()));
            false
        }

        Keyword::OneOf => {
            let Some(schemas) = value.as_schemas() else {
                return true;
            };
            if actual == InstanceType::Undefined {
                return true;
            }
            let matched = schemas.iter().filter(|schema| ctx.probe(schema, data)).count();
            if matched == 1 {
                return true;
            }
            ctx.fail(name, format!("value matches {matched} schemas, expected exactly one"));
            false
        }

        Keyword::Not => {
            let Some(schema) = value.as_schema() else {
                return true;
            };
            if actual == InstanceType::Undefined || !ctx.probe(schema, data) {
                return true;
            }
            ctx.fail(name, "value matches a schema it must not match");
            false
        }

        _ => true,
    }
}

/// Index of the first entry that accepts the data.
fn matches_any(
    ctx: &ValidationContext<'_>,
    entries: &[TypeEntry],
    data: Option<&Value>,
    actual: InstanceType,
) -> Option<usize> {
    entries.iter().position(|entry| match entry {
        TypeEntry::Simple(simple) => simple.accepts(actual),
        TypeEntry::Schema(schema) => ctx.probe(schema, data),
    })
}

fn describe(entries: &[TypeEntry<Arc<SchemaNode>>]) -> String {
    let names: Vec<&str> = entries
        .iter()
        .map(|entry| match entry {
            TypeEntry::Simple(simple) => simple.as_str(),
            TypeEntry::Schema(_) => "schema",
        })
        .collect();
    match names.as_slice() {
        [single] => (*single).to_string(),
        _ => format!("one of [{}]", names.join(", ")),
    }
}

fn number_of(data: Option<&Value>) -> Option<f64> {
    data.and_then(Value::as_f64)
}

fn check_count(ctx: &mut ValidationContext<'_>, keyword: Keyword, value: &KeywordValue, found: usize, unit: &str) -> bool {
    let Some(limit) = value.as_count() else {
        return true;
    };
    let found = found as u64;
    let is_min = matches!(keyword, Keyword::MinItems | Keyword::MinLength | Keyword::MinProperties);

    if is_min && found < limit {
        ctx.fail(keyword.name(), format!("{found} {unit}, fewer than {limit}"));
        return false;
    }
    if !is_min && found > limit {
        ctx.fail(keyword.name(), format!("{found} {unit}, more than {limit}"));
        return false;
    }
    true
}

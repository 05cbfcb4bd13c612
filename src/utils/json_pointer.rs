//! RFC 6901 pointers used as URI fragments (`#/definitions/address`).

use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Decode one pointer segment: `~1` becomes `/`, then `~0` becomes `~`.
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Walk `pointer` into `document`.
///
/// An empty pointer addresses the whole document. Every step has to land on
/// an object or array because the target is expected to be a schema; `uri`
/// only feeds error messages.
pub fn resolve_pointer<'a>(document: &'a Value, pointer: &str, uri: &str) -> Result<&'a Value> {
    if pointer.is_empty() {
        return Ok(document);
    }

    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(SchemaError::json_pointer(
            pointer,
            uri,
            "pointer must start with '/'",
        ));
    };

    let mut current = document;
    for raw_segment in rest.split('/') {
        let segment = unescape_segment(raw_segment);
        let next = match current {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        };

        current = match next {
            Some(value @ (Value::Object(_) | Value::Array(_))) => value,
            Some(_) => {
                return Err(SchemaError::json_pointer(
                    pointer,
                    uri,
                    format!("segment '{segment}' does not lead to an object or array"),
                ));
            }
            None => {
                return Err(SchemaError::json_pointer(
                    pointer,
                    uri,
                    format!("segment '{segment}' not found"),
                ));
            }
        };
    }

    Ok(current)
}

/// Append a property name or index to an instance path.
pub fn join_path(base: &str, segment: &str) -> String {
    format!("{base}/{}", escape_segment(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_into_properties() {
        let doc = json!({"properties": {"name": {"type": "string"}}});
        let target = resolve_pointer(&doc, "/properties/name", "http://h/s.json").unwrap();
        assert_eq!(target, &json!({"type": "string"}));
        assert_eq!(resolve_pointer(&doc, "", "http://h/s.json").unwrap(), &doc);
    }

    #[test]
    fn test_missing_segment_fails() {
        let doc = json!({"properties": {}});
        let err = resolve_pointer(&doc, "/bogus/0", "http://h/s.json").unwrap_err();
        assert!(matches!(err, SchemaError::JsonPointer { ref pointer, .. } if pointer == "/bogus/0"));
    }

    #[test]
    fn test_array_index_and_escapes() {
        let doc = json!({"a/b": {"m~n": [{"x": 1}, {"y": 2}]}});
        let target = resolve_pointer(&doc, "/a~1b/m~0n/1", "u").unwrap();
        assert_eq!(target, &json!({"y": 2}));
        assert!(resolve_pointer(&doc, "/a~1b/m~0n/7", "u").is_err());
        assert!(resolve_pointer(&doc, "/a~1b/m~0n/first", "u").is_err());
    }

    #[test]
    fn test_malformed_and_scalar_targets() {
        let doc = json!({"definitions": {"n": {"type": "integer"}}});
        assert!(resolve_pointer(&doc, "definitions", "u").is_err());
        assert!(resolve_pointer(&doc, "/definitions/n/type", "u").is_err());
    }

    #[test]
    fn test_escape_round() {
        assert_eq!(unescape_segment("~01"), "~1");
        assert_eq!(escape_segment("a/b~c"), "a~1b~0c");
        assert_eq!(join_path("", "a/b"), "/a~1b");
        assert_eq!(join_path("/items", "2"), "/items/2");
    }
}

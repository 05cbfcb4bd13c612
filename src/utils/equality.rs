// Structural equality for JSON values

use serde_json::{Number, Value};

/// Structural equality as JSON Schema sees it.
///
/// Differs from `Value`'s `PartialEq` only for numbers: `1` and `1.0` are
/// the same value here.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| deep_equal(l, r)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (x.as_u64(), y.as_u64()) {
        return l == r;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

/// Append the items of `extra` not already present in `target`.
pub fn unique_extend<I>(target: &mut Vec<Value>, extra: I)
where
    I: IntoIterator<Item = Value>,
{
    for item in extra {
        if !target.iter().any(|existing| deep_equal(existing, &item)) {
            target.push(item);
        }
    }
}

/// Index of the first item equal to an earlier one.
pub fn first_duplicate(items: &[Value]) -> Option<usize> {
    (1..items.len()).find(|&i| items[..i].iter().any(|earlier| deep_equal(earlier, &items[i])))
}

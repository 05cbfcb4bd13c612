use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Effective JSON Schema type of an instance value.
///
/// `Integer` is reported for whole numbers, `Null` for JSON null and
/// `Undefined` for a value that is absent altogether (a missing property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Undefined,
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

/// Simple type names accepted by `type` and `disallow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpleType {
    Any,
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

pub fn determine_type(data: Option<&Value>) -> InstanceType {
    match data {
        None => InstanceType::Undefined,
        Some(Value::Null) => InstanceType::Null,
        Some(Value::Bool(_)) => InstanceType::Boolean,
        Some(Value::Number(n)) => {
            if is_whole(n) {
                InstanceType::Integer
            } else {
                InstanceType::Number
            }
        }
        Some(Value::String(_)) => InstanceType::String,
        Some(Value::Array(_)) => InstanceType::Array,
        Some(Value::Object(_)) => InstanceType::Object,
    }
}

fn is_whole(n: &serde_json::Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

impl SimpleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleType::Any => "any",
            SimpleType::Array => "array",
            SimpleType::Boolean => "boolean",
            SimpleType::Integer => "integer",
            SimpleType::Null => "null",
            SimpleType::Number => "number",
            SimpleType::Object => "object",
            SimpleType::String => "string",
        }
    }

    /// Whether data of type `actual` satisfies this declared type.
    pub fn accepts(&self, actual: InstanceType) -> bool {
        match self {
            SimpleType::Any => actual != InstanceType::Undefined,
            SimpleType::Array => actual == InstanceType::Array,
            SimpleType::Boolean => actual == InstanceType::Boolean,
            SimpleType::Integer => actual == InstanceType::Integer,
            SimpleType::Null => actual == InstanceType::Null,
            SimpleType::Number => {
                matches!(actual, InstanceType::Number | InstanceType::Integer)
            }
            SimpleType::Object => actual == InstanceType::Object,
            SimpleType::String => actual == InstanceType::String,
        }
    }
}

impl FromStr for SimpleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(SimpleType::Any),
            "array" => Ok(SimpleType::Array),
            "boolean" => Ok(SimpleType::Boolean),
            "integer" => Ok(SimpleType::Integer),
            "null" => Ok(SimpleType::Null),
            "number" => Ok(SimpleType::Number),
            "object" => Ok(SimpleType::Object),
            "string" => Ok(SimpleType::String),
            other => Err(format!("unknown type name '{other}'")),
        }
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceType::Undefined => "undefined",
            InstanceType::Null => "null",
            InstanceType::Boolean => "boolean",
            InstanceType::Integer => "integer",
            InstanceType::Number => "number",
            InstanceType::String => "string",
            InstanceType::Array => "array",
            InstanceType::Object => "object",
        };
        f.write_str(name)
    }
}

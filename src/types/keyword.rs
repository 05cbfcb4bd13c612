use std::fmt;

/// Keywords understood by the resolver and validator.
///
/// Declaration order is the registry order: keywords are resolved and
/// validated in this order, which keeps failure reports stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    Id,
    Type,
    Properties,
    PatternProperties,
    AdditionalProperties,
    Items,
    AdditionalItems,
    Required,
    Dependencies,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MinItems,
    MaxItems,
    UniqueItems,
    Pattern,
    MinLength,
    MaxLength,
    MinProperties,
    MaxProperties,
    Enum,
    Default,
    Title,
    Description,
    Format,
    MultipleOf,
    DivisibleBy,
    Disallow,
    Extends,
    AllOf,
    AnyOf,
    OneOf,
    Not,
    Definitions,
}

/// How a keyword's raw value is checked and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKind {
    /// Resolved against the base URI and used as the node id.
    Id,
    /// Simple type names and schemas; empty becomes `any`.
    TypeList,
    /// Name to schema map, `{}` when absent or not an object.
    ObjectOfSchemas,
    /// Name to schema map, only present when given.
    OptionalObjectOfSchemas,
    /// Regex source to schema map.
    PatternSchemas,
    /// Boolean or schema, `true` when absent.
    BooleanOrSchema,
    /// One schema or a tuple of schemas.
    SchemaOrTuple,
    /// Boolean flag or list of required property names.
    Required,
    Dependencies,
    /// Any number, `null` when absent.
    NumberOrNull,
    /// Non-negative count, `null` when absent.
    CountOrNull,
    /// Positive number; a present value of any other shape is an error.
    PositiveNumber,
    BooleanDefaultFalse,
    /// Regular expression source.
    Pattern,
    /// Non-empty array, otherwise `null`.
    ArrayOrNull,
    /// Passed through untouched.
    Any,
    StringOrNull,
    /// One schema or a list of schemas, normalized to a list.
    SchemaOrSchemas,
    /// Non-empty list of schemas.
    SchemaList,
    Schema,
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordSpec {
    pub keyword: Keyword,
    pub name: &'static str,
    pub resolve: ResolveKind,
    /// Whether the keyword carries a validation rule of its own.
    pub validates: bool,
}

const fn spec(keyword: Keyword, name: &'static str, resolve: ResolveKind, validates: bool) -> KeywordSpec {
    KeywordSpec {
        keyword,
        name,
        resolve,
        validates,
    }
}

pub const KEYWORDS: &[KeywordSpec] = &[
    spec(Keyword::Id, "id", ResolveKind::Id, false),
    spec(Keyword::Type, "type", ResolveKind::TypeList, true),
    spec(Keyword::Properties, "properties", ResolveKind::ObjectOfSchemas, true),
    spec(Keyword::PatternProperties, "patternProperties", ResolveKind::PatternSchemas, true),
    spec(Keyword::AdditionalProperties, "additionalProperties", ResolveKind::BooleanOrSchema, true),
    spec(Keyword::Items, "items", ResolveKind::SchemaOrTuple, true),
    spec(Keyword::AdditionalItems, "additionalItems", ResolveKind::BooleanOrSchema, true),
    spec(Keyword::Required, "required", ResolveKind::Required, true),
    spec(Keyword::Dependencies, "dependencies", ResolveKind::Dependencies, true),
    spec(Keyword::Minimum, "minimum", ResolveKind::NumberOrNull, true),
    spec(Keyword::Maximum, "maximum", ResolveKind::NumberOrNull, true),
    spec(Keyword::ExclusiveMinimum, "exclusiveMinimum", ResolveKind::BooleanDefaultFalse, false),
    spec(Keyword::ExclusiveMaximum, "exclusiveMaximum", ResolveKind::BooleanDefaultFalse, false),
    spec(Keyword::MinItems, "minItems", ResolveKind::CountOrNull, true),
    spec(Keyword::MaxItems, "maxItems", ResolveKind::CountOrNull, true),
    spec(Keyword::UniqueItems, "uniqueItems", ResolveKind::BooleanDefaultFalse, true),
    spec(Keyword::Pattern, "pattern", ResolveKind::Pattern, true),
    spec(Keyword::MinLength, "minLength", ResolveKind::CountOrNull, true),
    spec(Keyword::MaxLength, "maxLength", ResolveKind::CountOrNull, true),
    spec(Keyword::MinProperties, "minProperties", ResolveKind::CountOrNull, true),
    spec(Keyword::MaxProperties, "maxProperties", ResolveKind::CountOrNull, true),
    spec(Keyword::Enum, "enum", ResolveKind::ArrayOrNull, true),
    spec(Keyword::Default, "default", ResolveKind::Any, false),
    spec(Keyword::Title, "title", ResolveKind::StringOrNull, false),
    spec(Keyword::Description, "description", ResolveKind::StringOrNull, false),
    spec(Keyword::Format, "format", ResolveKind::StringOrNull, false),
    spec(Keyword::MultipleOf, "multipleOf", ResolveKind::PositiveNumber, true),
    spec(Keyword::DivisibleBy, "divisibleBy", ResolveKind::PositiveNumber, true),
    spec(Keyword::Disallow, "disallow", ResolveKind::TypeList, true),
    spec(Keyword::Extends, "extends", ResolveKind::SchemaOrSchemas, true),
    spec(Keyword::AllOf, "allOf", ResolveKind::SchemaList, true),
    spec(Keyword::AnyOf, "anyOf", ResolveKind::SchemaList, true),
    spec(Keyword::OneOf, "oneOf", ResolveKind::SchemaList, true),
    spec(Keyword::Not, "not", ResolveKind::Schema, true),
    spec(Keyword::Definitions, "definitions", ResolveKind::OptionalObjectOfSchemas, false),
];

impl Keyword {
    pub fn spec(&self) -> &'static KeywordSpec {
        // KEYWORDS is declared in enum order, one entry per variant.
        &KEYWORDS[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Keyword> {
        KEYWORDS.iter().find(|spec| spec.name == name).map(|spec| spec.keyword)
    }

    pub fn all() -> impl Iterator<Item = Keyword> {
        KEYWORDS.iter().map(|spec| spec.keyword)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_matches_enum_order() {
        for (index, spec) in KEYWORDS.iter().enumerate() {
            assert_eq!(spec.keyword as usize, index, "{} out of order", spec.name);
            assert_eq!(spec.keyword.spec().name, spec.name);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Keyword::from_name("patternProperties"), Some(Keyword::PatternProperties));
        assert_eq!(Keyword::from_name("$ref"), None);
        assert_eq!(Keyword::DivisibleBy.to_string(), "divisibleBy");
        assert!(Keyword::Type < Keyword::Properties);
    }
}

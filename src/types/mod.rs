pub mod instance;
pub mod keyword;
pub mod schema;
pub mod uri;

pub use instance::{InstanceType, SimpleType, determine_type};
pub use keyword::{KEYWORDS, Keyword, KeywordSpec, ResolveKind};
pub use schema::{
    CompiledPattern, Dependency, KeywordValue, LinkSlot, MergedKeywords, PatternSchema, SchemaMap,
    SchemaNode, TypeEntry,
};
pub use uri::{Uri, resolve_uri};

//! # jsonschema-resolver
//!
//! An async JSON Schema engine for the Draft 3/4 keyword vocabulary. Raw
//! schema documents are resolved into immutable [`SchemaNode`] trees, with
//! `$ref` targets fetched through an injected transport, and instance data
//! is validated against them with structured failure reports.
//!
//! ## Features
//!
//! - **Resolution**: `$ref` substitution, per-keyword defaults and type checks, recursive references
//! - **Validation**: every supported keyword, failures reported with JSON Pointer paths
//! - **Caching**: raw and resolved schemas cached per URI, concurrent loads coalesced
//! - **Transports**: pluggable [`SchemaFetcher`], with in-memory and filesystem implementations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jsonschema_resolver::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<()> {
//! let fetcher = MemoryFetcher::new().with_document(
//!     "http://example.com/person.json",
//!     json!({"type": "object", "properties": {"age": {"type": "integer", "minimum": 0}}}),
//! );
//! let provider = SchemaProvider::new(Arc::new(fetcher));
//! let schema = provider.load("http://example.com/person.json", None).await?;
//!
//! let result = SchemaValidator::new().validate(&schema, &json!({"age": -1}));
//! assert!(!result.is_valid);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod provider;
pub mod resolver;
pub mod types;
pub mod utils;
pub mod validation;

pub use crate::core::{
    CacheConfig, CompletionBarrier, JobHandle, ProviderConfig, ResolverConfig, ValidationMode,
};
pub use error::{Result, SchemaError};
#[cfg(feature = "fs-fetcher")]
pub use provider::FileSystemFetcher;
pub use provider::{CacheStats, MemoryFetcher, SchemaFetcher, SchemaProvider};
pub use resolver::SchemaResolver;
pub use types::*;
pub use utils::{deep_equal, resolve_pointer};
pub use validation::{SchemaValidator, ValidationFailure, ValidationResult};

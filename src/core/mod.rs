pub mod barrier;
pub mod config;

pub use barrier::{CompletionBarrier, JobHandle};
pub use config::{CacheConfig, ProviderConfig, ResolverConfig, ValidationMode};

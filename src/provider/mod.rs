pub mod cache;
pub mod fetcher;

pub use cache::{CacheStats, SchemaProvider};
#[cfg(feature = "fs-fetcher")]
pub use fetcher::FileSystemFetcher;
pub use fetcher::{MemoryFetcher, SchemaFetcher};

//! Engine caching.
//!
//! Building a synthesis engine means reading two large weight files and
//! initializing a model runtime, so engines are kept resident in a small
//! [`ModelCache`] keyed by weight-file pair and evicted least-recently-used
//! first.
//!
//! Construct one cache per process and share it (usually behind an `Arc`)
//! with every component that needs engines.

pub mod config;
pub mod model_cache;
pub mod types;

pub use config::CacheConfig;
pub use model_cache::ModelCache;
pub use types::{CacheKey, CacheStats, Device, EngineHandle, EntrySummary, KeyMode, Precision};

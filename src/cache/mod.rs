//! Generic in-memory caching layer for read queries.
//!
//! This module knows nothing about employees or HTTP:
//! - Caches any serde-serializable value under a structured key
//! - Serves entries younger than their freshness window without a fetch
//! - Shares one fetch between concurrent readers of the same key
//! - Retries failed fetches per call
//! - Invalidates by key prefix, including fetches still in flight

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use traits::{CacheResult, CacheSource, Cacheable, QueryKey, QueryOptions};

//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

/// Trait for values that can be cached.
///
/// Entries are kept as JSON so one store can hold every value type; the
/// serde impls must round-trip.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Type name for log lines (e.g., "employee")
  fn entity_type() -> &'static str;
}

impl<T: Cacheable> Cacheable for Vec<T> {
  fn entity_type() -> &'static str {
    T::entity_type()
  }
}

/// Structured cache key.
///
/// Keys are compared structurally, never by string concatenation, and can be
/// matched against a coarser `Prefix` for bulk invalidation.
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  type Prefix: Debug;

  /// Whether this key falls inside `prefix`.
  fn starts_with(&self, prefix: &Self::Prefix) -> bool;

  /// Human-readable description for logs
  fn description(&self) -> String;
}

/// Per-read caching behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
  /// How long a fetched value is served without asking the network again
  pub stale_time: Duration,
  /// Extra attempts after a failed fetch
  pub retry: u32,
  pub retry_delay: Duration,
  /// Keep showing the previous key's data while a new key loads.
  /// Read by `Query`, the cache itself ignores it.
  pub keep_previous_data: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::ZERO,
      retry: 1,
      retry_delay: Duration::from_secs(1),
      keep_previous_data: false,
    }
  }
}

impl QueryOptions {
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn with_retry(mut self, retry: u32) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
    self.retry_delay = retry_delay;
    self
  }

  pub fn keep_previous_data(mut self, keep: bool) -> Self {
    self.keep_previous_data = keep;
    self
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched from the network
  pub fetched_at: DateTime<Utc>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at,
    }
  }

  pub fn from_cache(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      fetched_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched (or joined an in-flight fetch) for this read
  Network,
  /// Served from a fresh cache entry
  Cache,
}

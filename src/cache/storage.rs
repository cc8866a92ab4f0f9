//! In-memory entry and in-flight bookkeeping behind `CacheLayer`.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::traits::QueryKey;

/// A fetch that several readers of the same key can await together.
pub type SharedFetch<E> = Shared<BoxFuture<'static, Result<Value, E>>>;

/// A single cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub value: Value,
  pub fetched_at: DateTime<Utc>,
  stored_at: Instant,
  stale_time: Duration,
  /// Set by invalidation, forces a refetch regardless of age
  invalidated: bool,
}

impl CacheEntry {
  pub fn is_fresh(&self, now: Instant) -> bool {
    !self.invalidated && now.saturating_duration_since(self.stored_at) < self.stale_time
  }
}

struct InFlight<E> {
  id: u64,
  fetch: SharedFetch<E>,
  /// An invalidation covered this key while the fetch was running
  invalidated: bool,
}

pub struct MemoryStorage<K, E> {
  entries: HashMap<K, CacheEntry>,
  in_flight: HashMap<K, InFlight<E>>,
  next_id: u64,
}

impl<K: QueryKey, E: Clone> MemoryStorage<K, E> {
  pub fn new() -> Self {
    Self {
      entries: HashMap::new(),
      in_flight: HashMap::new(),
      next_id: 0,
    }
  }

  /// The entry for `key` if it may be served without a network call.
  pub fn fresh_entry(&self, key: &K, now: Instant) -> Option<&CacheEntry> {
    self.entries.get(key).filter(|entry| entry.is_fresh(now))
  }

  pub fn entry(&self, key: &K) -> Option<&CacheEntry> {
    self.entries.get(key)
  }

  /// The running fetch for `key`, with its id, if a new reader may join it.
  ///
  /// A fetch that an invalidation covered started before the write and is
  /// not offered; the next reader starts its own, which replaces it.
  pub fn in_flight(&self, key: &K) -> Option<(u64, SharedFetch<E>)> {
    self
      .in_flight
      .get(key)
      .filter(|pending| !pending.invalidated)
      .map(|pending| (pending.id, pending.fetch.clone()))
  }

  /// Register a new fetch for `key` and return its id.
  pub fn begin(&mut self, key: K, fetch: SharedFetch<E>) -> u64 {
    self.next_id += 1;
    let id = self.next_id;
    self.in_flight.insert(
      key,
      InFlight {
        id,
        fetch,
        invalidated: false,
      },
    );
    id
  }

  /// Record the outcome of fetch `id`.
  ///
  /// Only the first waiter to get here does anything; a fetch that was
  /// dropped by `clear` is discarded. A failure leaves any previous entry in
  /// place. Returns the stored entry's timestamp.
  pub fn finish(
    &mut self,
    key: &K,
    id: u64,
    result: &Result<Value, E>,
    stale_time: Duration,
  ) -> Option<DateTime<Utc>> {
    match self.in_flight.get(key) {
      Some(pending) if pending.id == id => {}
      _ => return None,
    }
    let pending = self.in_flight.remove(key)?;

    let value = result.as_ref().ok()?;
    let fetched_at = Utc::now();
    self.entries.insert(
      key.clone(),
      CacheEntry {
        value: value.clone(),
        fetched_at,
        stored_at: Instant::now(),
        stale_time,
        invalidated: pending.invalidated,
      },
    );
    Some(fetched_at)
  }

  /// Mark every entry under `prefix` stale, including results still in flight.
  /// Returns how many keys were affected.
  pub fn invalidate(&mut self, prefix: &K::Prefix) -> usize {
    let mut affected = 0;

    for (key, entry) in self.entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.invalidated = true;
        affected += 1;
      }
    }

    for (key, pending) in self.in_flight.iter_mut() {
      if key.starts_with(prefix) {
        pending.invalidated = true;
        affected += 1;
      }
    }

    affected
  }

  /// Forget everything, including fetches still running.
  pub fn clear(&mut self) {
    self.entries.clear();
    self.in_flight.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<K: QueryKey, E: Clone> Default for MemoryStorage<K, E> {
  fn default() -> Self {
    Self::new()
  }
}

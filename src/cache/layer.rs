//! Cache layer that orchestrates caching logic with network fetching.

use futures::FutureExt;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::storage::{MemoryStorage, SharedFetch};
use super::traits::{CacheResult, Cacheable, QueryKey, QueryOptions};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the application and the network client. Reads
/// are served from fresh entries, concurrent reads of one key share a single
/// fetch, and writes invalidate by key prefix. `E` is the fetch error type; it
/// must be cloneable since every reader of a shared fetch gets a copy.
pub struct CacheLayer<K, E> {
  storage: Arc<Mutex<MemoryStorage<K, E>>>,
}

impl<K, E> CacheLayer<K, E>
where
  K: QueryKey,
  E: Clone + Display + From<serde_json::Error> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      storage: Arc::new(Mutex::new(MemoryStorage::new())),
    }
  }

  fn storage(&self) -> MutexGuard<'_, MemoryStorage<K, E>> {
    // Storage is never left half-updated, so a poisoned lock is still usable
    self
      .storage
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Read `key`, going to the network only when needed.
  ///
  /// 1. Fresh entry - returned immediately
  /// 2. Fetch already running for the key, not invalidated since - wait for it
  /// 3. Otherwise fetch, retrying per `options`, and store the result
  ///
  /// A failed fetch surfaces its error and leaves any older entry untouched.
  pub async fn fetch<T, F, Fut>(
    &self,
    key: K,
    options: &QueryOptions,
    fetcher: F,
  ) -> Result<CacheResult<T>, E>
  where
    T: Cacheable,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let (id, fetch) = {
      let mut storage = self.storage();

      if let Some(entry) = storage.fresh_entry(&key, Instant::now()) {
        debug!(key = %key.description(), "cache hit");
        let data = serde_json::from_value(entry.value.clone()).map_err(E::from)?;
        return Ok(CacheResult::from_cache(data, entry.fetched_at));
      }

      match storage.in_flight(&key) {
        Some((id, fetch)) => {
          debug!(key = %key.description(), "joining in-flight fetch");
          (id, fetch)
        }
        None => {
          debug!(key = %key.description(), entity = T::entity_type(), "cache miss, fetching");
          let fetch: SharedFetch<E> = fetch_with_retry(
            fetcher,
            options.retry,
            options.retry_delay,
            key.description(),
          )
          .boxed()
          .shared();
          let id = storage.begin(key.clone(), fetch.clone());
          (id, fetch)
        }
      }
    };

    let result = fetch.await;
    let fetched_at = self
      .storage()
      .finish(&key, id, &result, options.stale_time)
      .unwrap_or_else(chrono::Utc::now);

    let data = serde_json::from_value(result?).map_err(E::from)?;
    Ok(CacheResult::from_network(data, fetched_at))
  }

  /// Mark every entry under `prefix` stale so its next read refetches.
  pub fn invalidate(&self, prefix: &K::Prefix) -> usize {
    let affected = self.storage().invalidate(prefix);
    debug!(?prefix, affected, "invalidated cache entries");
    affected
  }

  /// Drop all entries and abandon in-flight results.
  pub fn clear(&self) {
    self.storage().clear();
    debug!("cache cleared");
  }

  /// Last stored value for `key`, fresh or not.
  pub fn peek<T: Cacheable>(&self, key: &K) -> Option<T> {
    let storage = self.storage();
    let entry = storage.entry(key)?;
    serde_json::from_value(entry.value.clone()).ok()
  }

  /// Whether a read of `key` right now would be served from cache.
  pub fn is_fresh(&self, key: &K) -> bool {
    self.storage().fresh_entry(key, Instant::now()).is_some()
  }

  pub fn len(&self) -> usize {
    self.storage().len()
  }

  pub fn is_empty(&self) -> bool {
    self.storage().is_empty()
  }
}

async fn fetch_with_retry<T, E, F, Fut>(
  fetcher: F,
  retry: u32,
  retry_delay: Duration,
  description: String,
) -> Result<Value, E>
where
  T: Cacheable,
  E: Display + From<serde_json::Error>,
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let mut attempt = 0;
  loop {
    match fetcher().await {
      Ok(data) => return serde_json::to_value(&data).map_err(E::from),
      Err(e) if attempt < retry => {
        attempt += 1;
        warn!(key = %description, error = %e, attempt, "fetch failed, retrying");
        tokio::time::sleep(retry_delay).await;
      }
      Err(e) => {
        warn!(key = %description, error = %e, "fetch failed");
        return Err(e);
      }
    }
  }
}

impl<K, E> Clone for CacheLayer<K, E> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}

impl<K, E> Default for CacheLayer<K, E>
where
  K: QueryKey,
  E: Clone + Display + From<serde_json::Error> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::CacheSource;
  use serde::{Deserialize, Serialize};
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item {
    name: String,
  }

  impl Cacheable for Item {
    fn entity_type() -> &'static str {
      "item"
    }
  }

  #[derive(Debug, Clone, PartialEq, Eq, Hash)]
  struct TestKey(&'static str, &'static str);

  impl QueryKey for TestKey {
    type Prefix = &'static str;

    fn starts_with(&self, prefix: &Self::Prefix) -> bool {
      self.0 == *prefix
    }

    fn description(&self) -> String {
      format!("{}/{}", self.0, self.1)
    }
  }

  #[derive(Debug, Clone, PartialEq)]
  struct TestError(String);

  impl Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.write_str(&self.0)
    }
  }

  impl From<serde_json::Error> for TestError {
    fn from(e: serde_json::Error) -> Self {
      TestError(e.to_string())
    }
  }

  type Layer = CacheLayer<TestKey, TestError>;

  fn options() -> QueryOptions {
    QueryOptions::default()
      .with_stale_time(Duration::from_secs(300))
      .with_retry_delay(Duration::ZERO)
  }

  /// Fetcher that counts calls and returns an item named after the call number.
  fn counting(calls: &Arc<AtomicUsize>) -> impl Fn() -> futures::future::Ready<Result<Vec<Item>, TestError>> {
    let calls = calls.clone();
    move || {
      let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
      futures::future::ready(Ok(vec![Item {
        name: format!("call-{}", n),
      }]))
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_entry_served_without_refetch() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey("employees", "list");

    let first = layer.fetch(key.clone(), &options(), counting(&calls)).await.unwrap();
    let second = layer.fetch(key.clone(), &options(), counting(&calls)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, first.data);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_entry_refetches() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey("employees", "list");

    layer.fetch(key.clone(), &options(), counting(&calls)).await.unwrap();
    tokio::time::advance(Duration::from_secs(299)).await;
    layer.fetch(key.clone(), &options(), counting(&calls)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let result = layer.fetch(key, &options(), counting(&calls)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.data[0].name, "call-2");
  }

  #[tokio::test]
  async fn test_zero_stale_time_always_refetches() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let opts = options().with_stale_time(Duration::ZERO);

    layer.fetch(TestKey("employees", "detail"), &opts, counting(&calls)).await.unwrap();
    layer.fetch(TestKey("employees", "detail"), &opts, counting(&calls)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_distinct_keys_are_distinct_slots() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));

    layer.fetch(TestKey("employees", "a"), &options(), counting(&calls)).await.unwrap();
    layer.fetch(TestKey("employees", "b"), &options(), counting(&calls)).await.unwrap();
    layer.fetch(TestKey("employees", "a"), &options(), counting(&calls)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(layer.len(), 2);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch_under_prefix_only() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));

    layer.fetch(TestKey("employees", "list"), &options(), counting(&calls)).await.unwrap();
    layer.fetch(TestKey("users", "me"), &options(), counting(&calls)).await.unwrap();

    assert_eq!(layer.invalidate(&"employees"), 1);
    assert!(!layer.is_fresh(&TestKey("employees", "list")));
    assert!(layer.is_fresh(&TestKey("users", "me")));

    layer.fetch(TestKey("employees", "list"), &options(), counting(&calls)).await.unwrap();
    layer.fetch(TestKey("users", "me"), &options(), counting(&calls)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_fetch() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TestKey("employees", "list");

    let slow = {
      let calls = calls.clone();
      move || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(20)).await;
          Ok::<_, TestError>(vec![Item { name: "x".into() }])
        }
      }
    };

    let (opts_a, opts_b) = (options(), options());
    let (a, b) = tokio::join!(
      layer.fetch(key.clone(), &opts_a, slow.clone()),
      layer.fetch(key.clone(), &opts_b, slow),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap().data, b.unwrap().data);
  }

  #[tokio::test]
  async fn test_retries_once_then_succeeds() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let flaky = {
      let calls = calls.clone();
      move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
          if n == 0 {
            Err(TestError("transient".into()))
          } else {
            Ok(Item { name: "ok".into() })
          }
        }
      }
    };

    let result = layer.fetch(TestKey("employees", "detail"), &options(), flaky).await.unwrap();
    assert_eq!(result.data.name, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_error_surfaces_after_single_retry() {
    let layer = Layer::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let failing = {
      let calls = calls.clone();
      move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<Item, _>(TestError("down".into())) }
      }
    };

    let err = layer
      .fetch(TestKey("employees", "detail"), &options(), failing.clone())
      .await
      .unwrap_err();
    assert_eq!(err, TestError("down".into()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Retry is overridable per call
    calls.store(0, Ordering::SeqCst);
    let no_retry = options().with_retry(0);
    assert!(layer
      .fetch(TestKey("employees", "other"), &no_retry, failing)
      .await
      .is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_previous_entry() {
    let layer = Layer::new();
    let key = TestKey("employees", "list");
    let stale = options().with_stale_time(Duration::ZERO).with_retry(0);

    layer
      .fetch(key.clone(), &stale, || async { Ok::<_, TestError>(Item { name: "old".into() }) })
      .await
      .unwrap();
    let result = layer
      .fetch(key.clone(), &stale, || async { Err::<Item, _>(TestError("boom".into())) })
      .await;

    assert!(result.is_err());
    assert_eq!(layer.peek::<Item>(&key).unwrap().name, "old");
  }

  #[tokio::test]
  async fn test_invalidation_during_fetch_leaves_result_stale() {
    let layer = Layer::new();
    let key = TestKey("employees", "list");
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let release_rx = Arc::new(Mutex::new(Some(release_rx)));

    let gated = move || {
      let rx = release_rx.lock().unwrap().take();
      async move {
        if let Some(rx) = rx {
          let _ = rx.await;
        }
        Ok::<_, TestError>(Item { name: "pre-write".into() })
      }
    };

    let pending = {
      let layer = layer.clone();
      let key = key.clone();
      tokio::spawn(async move { layer.fetch(key, &options(), gated).await })
    };

    // Let the fetch register before invalidating
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(layer.invalidate(&"employees"), 1);
    let _ = release_tx.send(());

    let result = pending.await.unwrap().unwrap();
    assert_eq!(result.data.name, "pre-write");
    assert!(!layer.is_fresh(&key));
  }

  #[tokio::test]
  async fn test_read_after_invalidation_does_not_join_older_fetch() {
    let layer = Layer::new();
    let key = TestKey("employees", "list");
    let calls = Arc::new(AtomicUsize::new(0));
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let release_rx = Arc::new(Mutex::new(Some(release_rx)));

    // First call blocks until released and returns the pre-write list
    let fetcher = {
      let calls = calls.clone();
      move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let rx = release_rx.lock().unwrap().take();
        async move {
          if let Some(rx) = rx {
            let _ = rx.await;
          }
          let name = if n == 0 { "pre-write" } else { "post-write" };
          Ok::<_, TestError>(Item { name: name.into() })
        }
      }
    };

    let pending = {
      let layer = layer.clone();
      let key = key.clone();
      let fetcher = fetcher.clone();
      tokio::spawn(async move { layer.fetch(key, &options(), fetcher).await })
    };

    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    layer.invalidate(&"employees");

    let after = layer.fetch(key.clone(), &options(), fetcher).await.unwrap();
    assert_eq!(after.data.name, "post-write");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The superseded fetch finishing late does not overwrite the newer entry
    let _ = release_tx.send(());
    assert_eq!(pending.await.unwrap().unwrap().data.name, "pre-write");
    assert_eq!(layer.peek::<Item>(&key).unwrap().name, "post-write");
    assert!(layer.is_fresh(&key));
  }

  #[tokio::test]
  async fn test_clear_discards_in_flight_results() {
    let layer = Layer::new();
    let key = TestKey("employees", "list");

    let slow = || async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok::<_, TestError>(Item { name: "late".into() })
    };

    let pending = {
      let layer = layer.clone();
      let key = key.clone();
      tokio::spawn(async move { layer.fetch(key, &options(), slow).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    layer.clear();

    assert!(pending.await.unwrap().is_ok());
    assert!(layer.is_empty());
    assert!(layer.peek::<Item>(&key).is_none());
  }
}

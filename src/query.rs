//! View-side async state for reads and writes.
//!
//! `Query<T>` runs a read in the background and exposes its loading, success
//! and error states to a view that polls it from the event loop. `Mutation<T>`
//! does the same for a one-shot write. Neither caches anything; caching and
//! de-duplication happen below, in the directory client.
//!
//! # Example
//!
//! ```ignore
//! let directory = directory.clone();
//! let mut query = Query::new(move || {
//!     let directory = directory.clone();
//!     async move {
//!         directory
//!             .list_employees("")
//!             .await
//!             .map_err(|e| e.display_message())
//!     }
//! })
//! .with_options(&list_options);
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::cache::QueryOptions;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started, or is disabled
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_idle(&self) -> bool {
    matches!(self, QueryState::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure, replaceable when the query's
///   discriminator changes)
/// - Loading/success/error states
/// - Async result handling via channels
/// - Whether earlier data stays visible while a new fetch is in flight
pub struct Query<T> {
  state: QueryState<T>,
  /// Data shown in place of a pending result
  previous: Option<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
  keep_previous_data: bool,
  enabled: bool,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      previous: None,
      fetcher: box_fetcher(fetcher),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::ZERO,
      keep_previous_data: false,
      enabled: true,
    }
  }

  /// Set the stale time for this query.
  ///
  /// After this duration, the data is considered stale and `is_stale()` returns true.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Keep showing the last successful data while a new discriminator loads.
  pub fn with_keep_previous_data(mut self, keep: bool) -> Self {
    self.keep_previous_data = keep;
    self
  }

  /// Take stale time and the keep-previous policy from cache options.
  pub fn with_options(self, options: &QueryOptions) -> Self {
    self
      .with_stale_time(options.stale_time)
      .with_keep_previous_data(options.keep_previous_data)
  }

  /// A disabled query never fetches and stays `Idle`.
  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Data to render: the result when there is one, otherwise the data kept
  /// from before the pending fetch.
  pub fn data(&self) -> Option<&T> {
    self.state.data().or(match self.state {
      QueryState::Loading => self.previous.as_ref(),
      _ => None,
    })
  }

  /// Whether `data()` is the previous result standing in for a pending one.
  pub fn is_placeholder(&self) -> bool {
    self.state.is_loading() && self.previous.is_some()
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query succeeded.
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Check if the data is stale (older than stale_time).
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Enable or disable the query. Disabling drops any pending fetch and
  /// returns to `Idle`.
  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    if !enabled {
      self.receiver = None;
      self.previous = None;
      self.fetched_at = None;
      self.state = QueryState::Idle;
    }
  }

  /// Point the query at a new discriminator and fetch it.
  ///
  /// Whatever the query showed before is kept as a placeholder only when
  /// `keep_previous_data` is set; otherwise the view sees a plain loading
  /// state until the new result arrives.
  pub fn set_fetcher<F, Fut>(&mut self, fetcher: F)
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    self.fetcher = box_fetcher(fetcher);
    self.receiver = None;
    if self.enabled {
      self.start_fetch(self.keep_previous_data);
    } else {
      self.previous = None;
      self.state = QueryState::Idle;
    }
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading or disabled.
  pub fn fetch(&mut self) {
    if !self.enabled || self.state.is_loading() {
      return;
    }
    self.start_fetch(true);
  }

  /// Force a refetch, even if already loading or data exists. Current data
  /// stays visible until the new result lands.
  pub fn refetch(&mut self) {
    if !self.enabled {
      return;
    }
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch(true);
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.previous = None;
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.previous = None;
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.previous = None;
        self.receiver = None;
        true
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self, keep_current: bool) {
    let current = std::mem::replace(&mut self.state, QueryState::Loading);
    match current {
      QueryState::Success(data) if keep_current => self.previous = Some(data),
      // Already loading: keep whatever placeholder there is
      QueryState::Loading if keep_current => {}
      _ => self.previous = None,
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

fn box_fetcher<T, F, Fut>(fetcher: F) -> FetcherFn<T>
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, String>> + Send + 'static,
{
  Box::new(move || Box::pin(fetcher()))
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("enabled", &self.enabled)
      .field("keep_previous_data", &self.keep_previous_data)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

/// The state of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  Idle,
  Pending,
  Success(T),
  Error(String),
}

/// One-shot write with the same polling model as `Query`.
///
/// Writes are never retried here: a second `mutate` while one is pending is
/// ignored so a repeated submit cannot create a record twice.
pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, MutationState::Success(_))
  }

  pub fn data(&self) -> Option<&T> {
    match &self.state {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Run `future` unless a previous call is still pending.
  pub fn mutate<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    true
  }

  /// Returns `true` when the pending write settled.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let state = match receiver.try_recv() {
      Ok(Ok(data)) => MutationState::Success(data),
      Ok(Err(error)) => MutationState::Error(error),
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        MutationState::Error("Request was cancelled".to_string())
      }
    };

    self.state = state;
    self.receiver = None;
    true
  }

  /// Forget the last outcome. A pending write keeps running but its result
  /// is dropped.
  pub fn reset(&mut self) {
    self.receiver = None;
    self.state = MutationState::Idle;
  }
}

impl<T: Send + 'static> Default for Mutation<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

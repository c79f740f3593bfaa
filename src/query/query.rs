//! Keyed async query bound to the shared [`QueryCache`].
//!
//! Inspired by TanStack Query. A `Query` owns its parameters, derives a
//! cache key from them and subscribes that key. Fetches run as tokio tasks
//! that write straight into the cache; the view calls `poll()` on every tick
//! to pick up completed fetches and refetch invalidated entries.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! let mut query = Query::new(
//!   cache.clone(),
//!   window.clone(),
//!   |w: &PageWindow<GroupSort>| keys::groups(w),
//!   move |w: &PageWindow<GroupSort>| {
//!     let client = client.clone();
//!     let w = w.clone();
//!     async move { client.list_groups(&w).await }
//!   },
//! );
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!   // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::{QueryCache, Snapshot, Subscription};
use super::key::QueryKey;
use crate::api::ApiError;

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Query has not been started (or is disabled)
  Idle,
  /// Fetching with nothing to show yet
  Loading,
  /// Data is available
  Success(T),
  /// The latest fetch failed
  Error(ApiError),
}

impl<T> QueryState<T> {
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

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, ApiError>
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

type FetcherFn<P, T> = Arc<dyn Fn(&P) -> BoxFuture<T> + Send + Sync>;
type KeyFn<P> = Arc<dyn Fn(&P) -> QueryKey + Send + Sync>;
type SelectFn<T, U> = Arc<dyn Fn(&T) -> U + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueryOptions {
  /// When false the query never fetches
  pub enabled: bool,
  /// Keep showing the last successful data while a new key loads
  pub keep_previous_data: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      keep_previous_data: false,
    }
  }
}

pub struct Query<P, T, U = T> {
  cache: QueryCache,
  params: P,
  key_fn: KeyFn<P>,
  fetcher: FetcherFn<P, T>,
  select: SelectFn<T, U>,
  options: QueryOptions,
  state: QueryState<U>,
  /// True while `state` holds data from a previous key
  showing_previous: bool,
  seen_version: Option<u64>,
  subscription: Subscription,
}

impl<P, T> Query<P, T, T>
where
  P: Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
{
  /// Create a query and subscribe its initial key.
  ///
  /// Nothing is fetched until `fetch()` is called.
  pub fn new<K, F, Fut>(cache: QueryCache, params: P, key_fn: K, fetcher: F) -> Self
  where
    K: Fn(&P) -> QueryKey + Send + Sync + 'static,
    F: Fn(&P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let key = key_fn(&params);
    let subscription = cache.subscribe(&key);
    Self {
      cache,
      params,
      key_fn: Arc::new(key_fn),
      fetcher: Arc::new(move |p: &P| -> BoxFuture<T> { Box::pin(fetcher(p)) }),
      select: Arc::new(T::clone),
      options: QueryOptions::default(),
      state: QueryState::Idle,
      showing_previous: false,
      seen_version: None,
      subscription,
    }
  }
}

impl<P, T, U> Query<P, T, U>
where
  P: Send + Sync + 'static,
  T: Send + Sync + 'static,
{
  /// Transform fetched data before it is exposed.
  pub fn select<V>(self, select: impl Fn(&T) -> V + Send + Sync + 'static) -> Query<P, T, V> {
    Query {
      cache: self.cache,
      params: self.params,
      key_fn: self.key_fn,
      fetcher: self.fetcher,
      select: Arc::new(select),
      options: self.options,
      state: QueryState::Idle,
      showing_previous: false,
      seen_version: None,
      subscription: self.subscription,
    }
  }

  pub fn keep_previous_data(mut self) -> Self {
    self.options.keep_previous_data = true;
    self
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.options.enabled = enabled;
    self
  }

  pub fn state(&self) -> &QueryState<U> {
    &self.state
  }

  pub fn data(&self) -> Option<&U> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// A fetch for the current key is running, whether or not data is shown
  pub fn is_fetching(&self) -> bool {
    self.cache.is_in_flight(self.key())
  }

  /// The visible data belongs to the previous key
  pub fn is_previous_data(&self) -> bool {
    self.showing_previous
  }

  pub fn is_enabled(&self) -> bool {
    self.options.enabled
  }

  pub fn key(&self) -> &QueryKey {
    self.subscription.key()
  }

  pub fn params(&self) -> &P {
    &self.params
  }

  /// Switch to new parameters.
  ///
  /// When the derived key changes the new key is subscribed (the old one is
  /// released) and fetched unless the cache holds fresh data for it.
  pub fn set_params(&mut self, params: P) {
    let key = (self.key_fn)(&params);
    self.params = params;
    if &key == self.key() {
      return;
    }

    debug!(from = %self.key(), to = %key, "Query key changed");
    self.subscription = self.cache.subscribe(&key);
    self.seen_version = None;

    let had_data = self.state.is_success();
    if !self.sync() {
      if self.options.keep_previous_data && had_data {
        self.showing_previous = true;
      } else {
        self.state = QueryState::Idle;
        self.showing_previous = false;
      }
    }
    self.fetch();
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    let was_enabled = self.options.enabled;
    self.options.enabled = enabled;
    if enabled && !was_enabled {
      self.fetch();
    }
  }

  /// Fetch unless the cache already holds fresh data or a fetch is running.
  pub fn fetch(&mut self) {
    if !self.options.enabled {
      return;
    }
    if self.cache.is_fresh(self.key()) {
      self.sync();
      return;
    }
    if self.cache.is_in_flight(self.key()) {
      self.enter_loading();
      return;
    }
    self.start_fetch();
  }

  /// Force a new fetch for the current key regardless of freshness.
  pub fn refetch(&mut self) {
    if !self.options.enabled {
      return;
    }
    self.start_fetch();
  }

  /// Pick up cache changes for the current key.
  ///
  /// Returns `true` if the visible state changed. Invalidated entries are
  /// refetched here. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.sync();

    let needs_refetch = self
      .cache
      .snapshot(self.key())
      .is_some_and(|s| s.invalidated && !s.in_flight);
    if self.options.enabled && needs_refetch {
      debug!(key = %self.key(), "Refetching invalidated query");
      self.start_fetch();
      changed = true;
    }
    changed
  }

  /// Apply the cache entry if its version moved. Returns true if state changed.
  fn sync(&mut self) -> bool {
    let Some(snapshot) = self.cache.snapshot(self.key()) else {
      return false;
    };
    if self.seen_version == Some(snapshot.version) {
      return false;
    }
    self.seen_version = Some(snapshot.version);
    self.apply(&snapshot)
  }

  fn apply(&mut self, snapshot: &Snapshot) -> bool {
    if let Some(error) = &snapshot.error {
      self.state = QueryState::Error(error.clone());
      self.showing_previous = false;
      return true;
    }
    let Some(value) = &snapshot.value else {
      return false;
    };
    match value.data.downcast_ref::<T>() {
      Some(data) => {
        self.state = QueryState::Success((self.select)(data));
      }
      None => {
        warn!(key = %self.key(), "Cached value has an unexpected type");
        self.state = QueryState::Error(ApiError::Decode(format!(
          "cached value for {} has an unexpected type",
          self.key()
        )));
      }
    }
    self.showing_previous = false;
    true
  }

  fn enter_loading(&mut self) {
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }
  }

  fn start_fetch(&mut self) {
    let ticket = self.cache.begin_fetch(self.key());
    self.enter_loading();

    let future = (self.fetcher)(&self.params);
    let cache = self.cache.clone();
    tokio::spawn(async move {
      let result = future
        .await
        .map(|data| Arc::new(data) as super::cache::AnyData);
      if let Err(e) = &result {
        warn!(key = %ticket.key(), error = %e, "Query failed");
      }
      cache.complete(ticket, result);
    });
  }
}

impl<P, T, U: std::fmt::Debug> std::fmt::Debug for Query<P, T, U> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", self.subscription.key())
      .field("state", &self.state)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Page;
  use crate::query::pagination::{PageWindow, SortDirection, Unsorted};
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn cache() -> QueryCache {
    QueryCache::new(Duration::from_secs(60))
  }

  fn counting_query(
    cache: &QueryCache,
    calls: Arc<AtomicU32>,
  ) -> Query<u32, u32> {
    Query::new(
      cache.clone(),
      0u32,
      |p: &u32| QueryKey::new("items").with(*p),
      move |p: &u32| {
        let calls = calls.clone();
        let p = *p;
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(p * 10)
        }
      },
    )
  }

  #[tokio::test]
  async fn test_query_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&cache(), calls.clone());

    assert!(matches!(query.state(), QueryState::Idle));
    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.data(), Some(&0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<(), i32> = Query::new(
      cache(),
      (),
      |_| QueryKey::new("broken"),
      |_| async {
        Err(ApiError::Http {
          status: 500,
          message: "Failed to fetch groups".into(),
        })
      },
    );

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error().and_then(ApiError::status), Some(500));
  }

  #[tokio::test]
  async fn test_disabled_query_never_fetches() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&cache(), calls.clone()).enabled(false);

    query.fetch();
    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert!(matches!(query.state(), QueryState::Idle));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    query.set_enabled(true);
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));
  }

  #[tokio::test]
  async fn test_fresh_cache_skips_network() {
    let cache = cache();
    let calls = Arc::new(AtomicU32::new(0));

    let mut first = counting_query(&cache, calls.clone());
    first.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    first.poll();

    let mut second = counting_query(&cache, calls.clone());
    second.fetch();
    assert_eq!(second.data(), Some(&0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_bypasses_freshness() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&cache(), calls.clone());

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.refetch();
    // Data stays visible during a same-key refetch
    assert!(query.is_success());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_newest_fetch_wins_when_older_resolves_last() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();

    let mut query: Query<(), u32> = Query::new(
      cache(),
      (),
      |_| QueryKey::new("slow"),
      move |_| {
        let n = calls_clone.fetch_add(1, Ordering::SeqCst);
        async move {
          // First call is slow, second is fast
          let delay = if n == 0 { 80 } else { 5 };
          tokio::time::sleep(Duration::from_millis(delay)).await;
          Ok(n)
        }
      },
    );

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.refetch();

    tokio::time::sleep(Duration::from_millis(30)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));

    tokio::time::sleep(Duration::from_millis(100)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_keep_previous_data_across_page_change() {
    let mut query: Query<u32, Vec<u32>> = Query::new(
      cache(),
      0u32,
      |page: &u32| QueryKey::new("pages").with(*page),
      |page: &u32| {
        let page = *page;
        async move {
          tokio::time::sleep(Duration::from_millis(if page == 0 { 0 } else { 50 })).await;
          Ok(vec![page * 10, page * 10 + 1])
        }
      },
    )
    .keep_previous_data();

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&vec![0, 1]));

    query.set_params(1);
    assert!(!query.is_loading());
    assert!(query.is_previous_data());
    assert!(query.is_fetching());
    assert_eq!(query.data(), Some(&vec![0, 1]));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(query.poll());
    assert!(!query.is_previous_data());
    assert_eq!(query.data(), Some(&vec![10, 11]));
  }

  #[tokio::test]
  async fn test_page_change_without_keep_previous_shows_loading() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&cache(), calls);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.set_params(3);
    assert!(query.is_loading());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&30));
  }

  #[tokio::test]
  async fn test_invalidation_triggers_refetch() {
    let cache = cache();
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(&cache, calls.clone());

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate(&QueryKey::new("items"));
    assert!(query.poll());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cache.snapshot(query.key()).unwrap().invalidated);
  }

  #[tokio::test]
  async fn test_invalidation_during_fetch_refetches_after_completion() {
    let cache = cache();
    let backend = Arc::new(AtomicU32::new(0));
    let calls = Arc::new(AtomicU32::new(0));
    let (backend_clone, calls_clone) = (backend.clone(), calls.clone());

    let mut query: Query<(), u32> = Query::new(
      cache.clone(),
      (),
      |_| QueryKey::new("items"),
      move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        // The response reflects the backend as of when the request went out
        let seen = backend_clone.load(Ordering::SeqCst);
        async move {
          tokio::time::sleep(Duration::from_millis(40)).await;
          Ok(seen)
        }
      },
    );

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    backend.store(1, Ordering::SeqCst);
    cache.invalidate(&QueryKey::new("items"));

    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(10)).await;
      query.poll();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(query.data(), Some(&1));
    assert!(!cache.snapshot(query.key()).unwrap().invalidated);
  }

  #[tokio::test]
  async fn test_select_transforms_data() {
    let mut query = Query::new(
      cache(),
      (),
      |_| QueryKey::new("words"),
      |_| async { Ok(vec!["a".to_string(), "bb".to_string()]) },
    )
    .select(|words: &Vec<String>| words.iter().map(String::len).sum::<usize>());

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&3));
  }

  #[tokio::test]
  async fn test_drop_unsubscribes() {
    let cache = cache();
    let query = counting_query(&cache, Arc::new(AtomicU32::new(0)));
    let key = query.key().clone();
    drop(query);

    cache.invalidate(&key);
    assert!(!cache.contains(&key));
  }

  #[tokio::test]
  async fn test_groups_page_example() {
    let mut window: PageWindow<crate::api::types::GroupSort> = PageWindow::new(Default::default());
    window.set_direction(SortDirection::Desc);

    let mut query = Query::new(
      cache(),
      window,
      |w: &PageWindow<crate::api::types::GroupSort>| w.extend_key(QueryKey::new("groups")),
      |_| async {
        Ok(Page {
          items: vec!["a", "b", "c"],
          total_elements: 23,
          total_pages: 5,
          number: 0,
          last: false,
        })
      },
    );
    assert_eq!(
      query.key(),
      &QueryKey::new("groups")
        .with(0)
        .with(10)
        .with("createDate")
        .with("desc")
    );

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert!(!query.is_loading());
    assert!(!query.is_error());
    assert_eq!(query.data().map(|p| p.items.len()), Some(3));
  }

  #[tokio::test]
  async fn test_unsorted_window_key() {
    let window: PageWindow<Unsorted> = PageWindow::new(Default::default());
    let key = window.extend_key(QueryKey::new("groupsByMember").with("amira"));
    assert_eq!(
      key,
      QueryKey::new("groupsByMember").with("amira").with(0).with(10)
    );
  }
}

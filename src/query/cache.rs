//! In-memory query cache shared between views and fetch tasks.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::key::QueryKey;
use crate::api::ApiError;

/// Type-erased cached payload
pub type AnyData = Arc<dyn Any + Send + Sync>;

/// Successful fetch result and when it landed
#[derive(Clone)]
pub struct CachedValue {
  pub data: AnyData,
  pub fetched_at: Instant,
}

impl std::fmt::Debug for CachedValue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CachedValue")
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}

struct Entry {
  value: Option<CachedValue>,
  /// Error from the latest completed fetch, cleared by the next success
  error: Option<ApiError>,
  /// Sequence number of the most recently issued fetch
  issued: Option<u64>,
  in_flight: bool,
  invalidated: bool,
  /// Newest sequence number issued before the last invalidation. Results
  /// from fetches at or below it do not clear `invalidated`.
  invalidated_at: Option<u64>,
  subscribers: usize,
  /// Bumped whenever subscribers should re-read the entry
  version: u64,
  updated_at: Instant,
}

impl Entry {
  fn new() -> Self {
    Self {
      value: None,
      error: None,
      issued: None,
      in_flight: false,
      invalidated: false,
      invalidated_at: None,
      subscribers: 0,
      version: 0,
      updated_at: Instant::now(),
    }
  }
}

/// Read-only copy of an entry's state
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub value: Option<CachedValue>,
  pub error: Option<ApiError>,
  pub in_flight: bool,
  pub invalidated: bool,
  pub version: u64,
}

/// Proof that a fetch was issued; handed back to [`QueryCache::complete`]
#[derive(Debug)]
pub struct Ticket {
  key: QueryKey,
  seq: u64,
}

impl Ticket {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

#[derive(Default)]
struct CacheInner {
  entries: HashMap<QueryKey, Entry>,
  next_seq: u64,
}

/// Key → entry table.
///
/// Cloning is cheap; all clones share the same table.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Mutex<CacheInner>>,
  stale_time: Duration,
}

impl std::fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.len())
      .field("stale_time", &self.stale_time)
      .finish()
  }
}

impl QueryCache {
  pub fn new(stale_time: Duration) -> Self {
    Self {
      inner: Arc::new(Mutex::new(CacheInner::default())),
      stale_time,
    }
  }

  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  /// Register interest in `key`, creating the entry if needed.
  ///
  /// The entry stays subscribed until the returned guard is dropped.
  pub fn subscribe(&self, key: &QueryKey) -> Subscription {
    let mut inner = self.inner.lock();
    inner
      .entries
      .entry(key.clone())
      .or_insert_with(Entry::new)
      .subscribers += 1;
    Subscription {
      cache: self.clone(),
      key: key.clone(),
    }
  }

  fn unsubscribe(&self, key: &QueryKey) {
    let mut inner = self.inner.lock();
    if let Some(entry) = inner.entries.get_mut(key) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      if entry.subscribers == 0 {
        entry.updated_at = Instant::now();
      }
    }
  }

  /// Record a new fetch for `key`. Only the latest ticket's result is kept.
  pub fn begin_fetch(&self, key: &QueryKey) -> Ticket {
    let mut inner = self.inner.lock();
    inner.next_seq += 1;
    let seq = inner.next_seq;
    let entry = inner.entries.entry(key.clone()).or_insert_with(Entry::new);
    entry.issued = Some(seq);
    entry.in_flight = true;
    debug!(key = %key, seq, "Fetch issued");
    Ticket {
      key: key.clone(),
      seq,
    }
  }

  /// Apply a fetch result.
  ///
  /// Returns false when the result was discarded because a newer fetch was
  /// issued for the same key, or the entry no longer exists.
  pub fn complete(&self, ticket: Ticket, result: Result<AnyData, ApiError>) -> bool {
    let mut inner = self.inner.lock();
    let Some(entry) = inner.entries.get_mut(&ticket.key) else {
      debug!(key = %ticket.key, seq = ticket.seq, "Dropping result for evicted entry");
      return false;
    };
    if entry.issued != Some(ticket.seq) {
      debug!(
        key = %ticket.key,
        seq = ticket.seq,
        latest = ?entry.issued,
        "Discarding stale response"
      );
      return false;
    }

    match result {
      Ok(data) => {
        entry.value = Some(CachedValue {
          data,
          fetched_at: Instant::now(),
        });
        entry.error = None;
      }
      Err(e) => entry.error = Some(e),
    }
    entry.in_flight = false;
    if !matches!(entry.invalidated_at, Some(at) if ticket.seq <= at) {
      entry.invalidated = false;
      entry.invalidated_at = None;
    } else {
      debug!(key = %ticket.key, seq = ticket.seq, "Response predates invalidation");
    }
    entry.version += 1;
    entry.updated_at = Instant::now();
    true
  }

  pub fn snapshot(&self, key: &QueryKey) -> Option<Snapshot> {
    let inner = self.inner.lock();
    inner.entries.get(key).map(|entry| Snapshot {
      value: entry.value.clone(),
      error: entry.error.clone(),
      in_flight: entry.in_flight,
      invalidated: entry.invalidated,
      version: entry.version,
    })
  }

  /// True when `key` holds a successful value younger than the stale time.
  pub fn is_fresh(&self, key: &QueryKey) -> bool {
    let inner = self.inner.lock();
    inner.entries.get(key).is_some_and(|entry| {
      !entry.invalidated
        && entry.error.is_none()
        && entry
          .value
          .as_ref()
          .is_some_and(|v| v.fetched_at.elapsed() < self.stale_time)
    })
  }

  pub fn is_in_flight(&self, key: &QueryKey) -> bool {
    let inner = self.inner.lock();
    inner.entries.get(key).is_some_and(|entry| entry.in_flight)
  }

  /// Invalidate every entry whose key starts with `prefix`.
  ///
  /// Subscribed entries are marked stale so their queries refetch on the
  /// next poll; unsubscribed entries are removed. Returns the number of
  /// matching entries.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut inner = self.inner.lock();
    let issued = inner.next_seq;
    let mut marked = 0;
    let mut removed = 0;
    inner.entries.retain(|key, entry| {
      if !key.starts_with(prefix) {
        return true;
      }
      if entry.subscribers > 0 {
        entry.invalidated = true;
        entry.invalidated_at = Some(issued);
        entry.version += 1;
        marked += 1;
        true
      } else {
        removed += 1;
        false
      }
    });
    if marked + removed > 0 {
      info!(prefix = %prefix, marked, removed, "Invalidated queries");
    }
    marked + removed
  }

  /// Remove unsubscribed, idle entries untouched for at least `max_idle`.
  pub fn gc(&self, max_idle: Duration) -> usize {
    let mut inner = self.inner.lock();
    let before = inner.entries.len();
    inner.entries.retain(|_, entry| {
      entry.subscribers > 0 || entry.in_flight || entry.updated_at.elapsed() < max_idle
    });
    let evicted = before - inner.entries.len();
    if evicted > 0 {
      debug!(evicted, "Evicted idle queries");
    }
    evicted
  }

  /// Store data for `key` as if a fetch had just succeeded.
  pub fn set_data<T: Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
    let ticket = self.begin_fetch(key);
    self.complete(ticket, Ok(Arc::new(data)));
  }

  pub fn len(&self) -> usize {
    self.inner.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.inner.lock().entries.contains_key(key)
  }
}

/// Keeps a cache entry subscribed while alive
#[derive(Debug)]
pub struct Subscription {
  cache: QueryCache,
  key: QueryKey,
}

impl Subscription {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.cache.unsubscribe(&self.key);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn data(n: i32) -> Result<AnyData, ApiError> {
    Ok(Arc::new(n))
  }

  fn value_of(cache: &QueryCache, key: &QueryKey) -> Option<i32> {
    cache
      .snapshot(key)
      .and_then(|s| s.value)
      .and_then(|v| v.data.downcast_ref::<i32>().copied())
  }

  #[test]
  fn test_last_issued_wins() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let key = QueryKey::new("groups").with(0);
    let _sub = cache.subscribe(&key);

    let first = cache.begin_fetch(&key);
    let second = cache.begin_fetch(&key);

    // Newer fetch resolves first
    assert!(cache.complete(second, data(2)));
    assert!(!cache.complete(first, data(1)));
    assert_eq!(value_of(&cache, &key), Some(2));
  }

  #[test]
  fn test_error_keeps_previous_value() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let key = QueryKey::new("group").with(4);
    cache.set_data(&key, 7);

    let ticket = cache.begin_fetch(&key);
    cache.complete(ticket, Err(ApiError::Transport("reset".into())));

    let snapshot = cache.snapshot(&key).unwrap();
    assert!(snapshot.error.is_some());
    assert_eq!(value_of(&cache, &key), Some(7));
    assert!(!cache.is_fresh(&key));
  }

  #[test]
  fn test_invalidate_marks_subscribed_and_drops_unsubscribed() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let mounted = QueryKey::new("publicationComments").with(12).with(0);
    let unmounted = QueryKey::new("publicationComments").with(12).with(1);
    let other = QueryKey::new("publications");

    let _sub = cache.subscribe(&mounted);
    cache.set_data(&mounted, 1);
    cache.set_data(&unmounted, 2);
    cache.set_data(&other, 3);

    let matched = cache.invalidate(&QueryKey::new("publicationComments").with(12));
    assert_eq!(matched, 2);

    assert!(cache.snapshot(&mounted).unwrap().invalidated);
    assert!(!cache.is_fresh(&mounted));
    assert!(!cache.contains(&unmounted));
    assert!(cache.is_fresh(&other));
  }

  #[test]
  fn test_response_issued_before_invalidation_stays_invalidated() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let key = QueryKey::new("reactionCounts").with(9);
    let _sub = cache.subscribe(&key);

    let before = cache.begin_fetch(&key);
    cache.invalidate(&QueryKey::new("reactionCounts"));
    assert!(cache.complete(before, data(1)));

    let snapshot = cache.snapshot(&key).unwrap();
    assert!(snapshot.invalidated);
    assert!(!snapshot.in_flight);
    assert_eq!(value_of(&cache, &key), Some(1));

    let after = cache.begin_fetch(&key);
    assert!(cache.complete(after, data(2)));
    assert!(!cache.snapshot(&key).unwrap().invalidated);
    assert!(cache.is_fresh(&key));
  }

  #[test]
  fn test_completion_after_eviction_is_dropped() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let key = QueryKey::new("publication").with(5);
    let ticket = cache.begin_fetch(&key);
    cache.invalidate(&key);
    assert!(!cache.complete(ticket, data(1)));
    assert!(!cache.contains(&key));
  }

  #[test]
  fn test_subscription_drop_releases_entry() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let key = QueryKey::new("groups");
    let sub = cache.subscribe(&key);
    cache.set_data(&key, 1);

    assert_eq!(cache.gc(Duration::ZERO), 0);
    drop(sub);
    assert_eq!(cache.gc(Duration::ZERO), 1);
    assert!(cache.is_empty());
  }

  #[test]
  fn test_gc_respects_idle_time() {
    let cache = QueryCache::new(Duration::from_secs(60));
    cache.set_data(&QueryKey::new("groups"), 1);
    assert_eq!(cache.gc(Duration::from_secs(300)), 0);
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_freshness_respects_stale_time() {
    let cache = QueryCache::new(Duration::ZERO);
    let key = QueryKey::new("groups");
    cache.set_data(&key, 1);
    assert!(!cache.is_fresh(&key));
  }
}

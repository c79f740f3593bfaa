use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::cache::QueryCache;
use super::key::QueryKey;
use super::query::BoxFuture;
use crate::api::ApiError;

type MutatorFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<O> + Send + Sync>;
type InvalidatesFn<I> = Arc<dyn Fn(&I) -> Vec<QueryKey> + Send + Sync>;

/// A write operation that invalidates dependent queries on success.
///
/// `mutate` returns immediately; the outcome arrives through `poll()` on a
/// later tick. Concurrent calls are neither coalesced nor queued.
pub struct Mutation<I, O> {
  cache: QueryCache,
  mutator: MutatorFn<I, O>,
  invalidates: InvalidatesFn<I>,
  sender: mpsc::UnboundedSender<Result<O, ApiError>>,
  receiver: mpsc::UnboundedReceiver<Result<O, ApiError>>,
  pending: usize,
}

impl<I, O> Mutation<I, O>
where
  I: Send + 'static,
  O: Send + 'static,
{
  /// `invalidates` lists the key prefixes to mark stale once `input` succeeds.
  pub fn new<F, Fut, K>(cache: QueryCache, mutator: F, invalidates: K) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ApiError>> + Send + 'static,
    K: Fn(&I) -> Vec<QueryKey> + Send + Sync + 'static,
  {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      cache,
      mutator: Arc::new(move |input: I| -> BoxFuture<O> { Box::pin(mutator(input)) }),
      invalidates: Arc::new(invalidates),
      sender,
      receiver,
      pending: 0,
    }
  }

  /// Start the write in the background.
  pub fn mutate(&mut self, input: I) {
    let keys = (self.invalidates)(&input);
    let future = (self.mutator)(input);
    let cache = self.cache.clone();
    let sender = self.sender.clone();
    self.pending += 1;

    tokio::spawn(async move {
      let result = settle(&cache, keys, future.await);
      // Receiver may have been dropped with its view
      let _ = sender.send(result);
    });
  }

  /// Run the write to completion, invalidating on success.
  pub async fn run(&self, input: I) -> Result<O, ApiError> {
    let keys = (self.invalidates)(&input);
    let result = (self.mutator)(input).await;
    settle(&self.cache, keys, result)
  }

  /// Next finished outcome, if any. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> Option<Result<O, ApiError>> {
    match self.receiver.try_recv() {
      Ok(result) => {
        self.pending = self.pending.saturating_sub(1);
        Some(result)
      }
      Err(_) => None,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.pending > 0
  }
}

fn settle<O>(
  cache: &QueryCache,
  keys: Vec<QueryKey>,
  result: Result<O, ApiError>,
) -> Result<O, ApiError> {
  match &result {
    Ok(_) => {
      debug!(keys = keys.len(), "Mutation succeeded");
      for key in &keys {
        cache.invalidate(key);
      }
    }
    Err(e) => warn!(error = %e, "Mutation failed"),
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_success_invalidates_declared_keys() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let list = QueryKey::new("groups").with(0).with(10);
    let detail = QueryKey::new("group").with(4);
    let unrelated = QueryKey::new("publications");
    let _a = cache.subscribe(&list);
    let _b = cache.subscribe(&detail);
    cache.set_data(&list, 1);
    cache.set_data(&detail, 2);
    cache.set_data(&unrelated, 3);

    let mut mutation = Mutation::new(
      cache.clone(),
      |id: i64| async move { Ok(id) },
      |id: &i64| vec![QueryKey::new("groups"), QueryKey::new("group").with(*id)],
    );

    mutation.mutate(4);
    assert!(mutation.is_loading());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(mutation.poll(), Some(Ok(4)));
    assert!(!mutation.is_loading());
    assert!(cache.snapshot(&list).unwrap().invalidated);
    assert!(cache.snapshot(&detail).unwrap().invalidated);
    assert!(cache.is_fresh(&unrelated));
  }

  #[tokio::test]
  async fn test_failure_invalidates_nothing() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let list = QueryKey::new("groups");
    let _sub = cache.subscribe(&list);
    cache.set_data(&list, 1);

    let mutation: Mutation<(), ()> = Mutation::new(
      cache.clone(),
      |_| async {
        Err(ApiError::Forbidden {
          message: "You do not have permission to delete this group".into(),
        })
      },
      |_| vec![QueryKey::new("groups")],
    );

    let err = mutation.run(()).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(cache.is_fresh(&list));
  }

  #[tokio::test]
  async fn test_concurrent_mutations_each_report() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let mut mutation = Mutation::new(
      cache,
      |n: u32| async move {
        tokio::time::sleep(Duration::from_millis(5 * n as u64)).await;
        Ok(n)
      },
      |_| Vec::new(),
    );

    mutation.mutate(2);
    mutation.mutate(1);
    tokio::time::sleep(Duration::from_millis(30)).await;

    let mut results = vec![
      mutation.poll().unwrap().unwrap(),
      mutation.poll().unwrap().unwrap(),
    ];
    results.sort();
    assert_eq!(results, vec![1, 2]);
    assert!(mutation.poll().is_none());
  }
}

use crate::api::{ApiClient, Change};
use crate::query::{Mutation, PageSize, PageWindow, QueryCache, SortField};

/// Shared handles every view is built from
#[derive(Debug, Clone)]
pub struct Context {
  pub client: ApiClient,
  pub cache: QueryCache,
  pub page_size: PageSize,
  pub username: Option<String>,
}

impl Context {
  pub fn new(client: ApiClient, cache: QueryCache, page_size: PageSize) -> Self {
    let username = client.session().username().map(str::to_string);
    Self {
      client,
      cache,
      page_size,
      username,
    }
  }

  pub fn username(&self) -> Option<&str> {
    self.username.as_deref()
  }

  /// A fresh page window at the configured size
  pub fn window<S: SortField>(&self) -> PageWindow<S> {
    PageWindow::new(self.page_size)
  }

  /// A mutation whose input describes both the request and the [`Change`]
  /// it makes.
  pub fn mutation<I, O, F, Fut>(&self, run: F) -> Mutation<I, O>
  where
    I: Changes + Send + 'static,
    O: Send + 'static,
    F: Fn(ApiClient, I) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<O, crate::api::ApiError>> + Send + 'static,
  {
    let client = self.client.clone();
    Mutation::new(
      self.cache.clone(),
      move |input: I| run(client.clone(), input),
      |input: &I| input.change().invalidates(),
    )
  }
}

/// Mutation inputs that know which write they perform
pub trait Changes {
  fn change(&self) -> Change;
}

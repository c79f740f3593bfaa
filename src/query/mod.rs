//! Keyed query cache, mutations and list/thread view state.
//!
//! - `QueryCache` holds one entry per `QueryKey`, shared by every view
//! - `Query` reads a key and refetches it when invalidated
//! - `Mutation` runs a write and invalidates dependent key prefixes
//! - `PageWindow` and `ThreadState` hold client-local list state

mod cache;
mod key;
mod mutation;
pub mod pagination;
#[allow(clippy::module_inception)]
mod query;
pub mod tree;

pub use cache::{QueryCache, Subscription};
pub use key::{KeyPart, QueryKey};
pub use mutation::Mutation;
pub use pagination::{PageNav, PageSize, PageWindow, SortDirection, SortField, Unsorted};
pub use query::{BoxFuture, Query, QueryState};
pub use tree::{Expansion, ThreadState, Threaded};

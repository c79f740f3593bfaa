//! Typed access to the Greenspace REST backend.

mod api_types;
mod client;
mod comments;
mod error;
mod groups;
mod images;
mod invalidation;
pub mod keys;
mod media;
mod publications;
mod reactions;
mod session;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use images::ImageBlob;
pub use invalidation::Change;
pub use session::Session;

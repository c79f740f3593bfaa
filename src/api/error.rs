//! Error taxonomy for backend calls.

use thiserror::Error;

/// Errors produced by the resource client.
///
/// Cloneable so a failed fetch can be stored in the query cache and shown by
/// every view subscribed to the same key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// The call needs a bearer token and the session has none
  #[error("Not signed in. Set GREENSPACE_TOKEN to talk to the backend.")]
  Unauthenticated,

  /// A required id, username or file was absent
  #[error("Missing required parameter: {0}")]
  MissingParameter(&'static str),

  /// 404 from the backend
  #[error("{message}")]
  NotFound { message: String },

  /// 403 from the backend
  #[error("{message}")]
  Forbidden { message: String },

  /// Any other status outside 200-299
  #[error("{message} (HTTP {status})")]
  Http { status: u16, message: String },

  /// Connection, TLS or body-read failure
  #[error("Network error: {0}")]
  Transport(String),

  /// The backend answered 2xx with a body we could not parse
  #[error("Unexpected response: {0}")]
  Decode(String),

  /// A local file picked for upload could not be read
  #[error("Could not read {0}")]
  File(String),
}

impl ApiError {
  /// HTTP status carried by this error, if it came from a response.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::NotFound { .. } => Some(404),
      ApiError::Forbidden { .. } => Some(403),
      ApiError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    ApiError::Transport(e.to_string())
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(e: serde_json::Error) -> Self {
    ApiError::Decode(e.to_string())
  }
}

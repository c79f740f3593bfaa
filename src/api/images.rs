//! Authenticated image downloads.

use bytes::Bytes;
use url::Url;

use super::client::{ApiClient, Request};
use super::error::ApiError;

/// Downloaded image bytes.
///
/// Clones share one buffer, released when the last clone drops.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlob {
  pub bytes: Bytes,
  pub content_type: Option<String>,
}

impl ImageBlob {
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

/// Where an image path points
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImageSource {
  Absolute(Url),
  /// Segments under `/images/`
  Stored(Vec<String>),
}

fn resolve(path: &str) -> Result<ImageSource, ApiError> {
  let path = path.trim();
  if path.is_empty() {
    return Err(ApiError::MissingParameter("image path"));
  }
  if path.starts_with("http://") || path.starts_with("https://") {
    let url = Url::parse(path).map_err(|e| ApiError::Transport(format!("bad image URL: {e}")))?;
    return Ok(ImageSource::Absolute(url));
  }
  let path = path.trim_start_matches('/');
  let path = path.strip_prefix("images/").unwrap_or(path);
  Ok(ImageSource::Stored(
    path
      .split('/')
      .filter(|s| !s.is_empty())
      .map(str::to_string)
      .collect(),
  ))
}

impl ApiClient {
  /// Fetch an image by stored path (`avatars/a.png`) or absolute URL.
  pub async fn fetch_image(&self, path: &str) -> Result<ImageBlob, ApiError> {
    let request = match resolve(path)? {
      ImageSource::Absolute(url) => Request::absolute("fetch image", url),
      ImageSource::Stored(segments) => {
        Request::get("fetch image", std::iter::once("images".to_string()).chain(segments))
      }
    };
    let response = self.send(request).await?;
    Ok(ImageBlob {
      bytes: response.body,
      content_type: response.content_type,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server;
  use axum::http::header;
  use axum::routing::get;
  use axum::Router;

  #[test]
  fn test_resolve_paths() {
    assert_eq!(
      resolve("/images/avatars/a.png").unwrap(),
      ImageSource::Stored(vec!["avatars".into(), "a.png".into()])
    );
    assert_eq!(
      resolve("cover.jpg").unwrap(),
      ImageSource::Stored(vec!["cover.jpg".into()])
    );
    assert!(matches!(
      resolve("https://cdn.example.com/x.png").unwrap(),
      ImageSource::Absolute(_)
    ));
    assert_eq!(resolve(" "), Err(ApiError::MissingParameter("image path")));
  }

  #[tokio::test]
  async fn test_fetch_image_returns_bytes() {
    let router = Router::new().route(
      "/images/avatars/{name}",
      get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![137u8, 80, 78, 71]) }),
    );
    let client = test_server::spawn(router).await;

    let blob = client.fetch_image("avatars/a.png").await.unwrap();
    assert_eq!(blob.len(), 4);
    assert_eq!(blob.content_type.as_deref(), Some("image/png"));

    let shared = blob.clone();
    drop(blob);
    assert_eq!(&shared.bytes[..2], &[137, 80]);
  }
}

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{multipart, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::api::error::ApiError;
use crate::api::session::Session;
use crate::api::types::Upload;
use crate::config::Config;

/// Where a request goes
#[derive(Debug, Clone)]
enum Target {
  /// Path segments appended to the base URL; each is percent-encoded
  Segments(Vec<String>),
  /// Fully-qualified URL used as-is
  Absolute(Url),
}

/// One multipart form field
#[derive(Debug, Clone)]
pub enum FormPart {
  Text { name: String, value: String },
  File { name: String, upload: Upload },
}

#[derive(Debug, Clone, Default)]
pub enum Body {
  #[default]
  Empty,
  Json(Vec<u8>),
  Form(Vec<FormPart>),
}

/// A request description, built by the endpoint modules and executed by
/// [`ApiClient::send`].
#[derive(Debug, Clone)]
pub struct Request {
  method: Method,
  target: Target,
  params: Vec<(&'static str, String)>,
  body: Body,
  /// Verb phrase used in "Failed to <action>" fallbacks
  action: &'static str,
  /// Replacement message for 403 responses
  forbidden: Option<&'static str>,
}

impl Request {
  pub fn new<I, S>(method: Method, action: &'static str, segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: ToString,
  {
    Self {
      method,
      target: Target::Segments(segments.into_iter().map(|s| s.to_string()).collect()),
      params: Vec::new(),
      body: Body::Empty,
      action,
      forbidden: None,
    }
  }

  pub fn get<I, S>(action: &'static str, segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: ToString,
  {
    Self::new(Method::GET, action, segments)
  }

  pub fn post<I, S>(action: &'static str, segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: ToString,
  {
    Self::new(Method::POST, action, segments)
  }

  pub fn put<I, S>(action: &'static str, segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: ToString,
  {
    Self::new(Method::PUT, action, segments)
  }

  pub fn delete<I, S>(action: &'static str, segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: ToString,
  {
    Self::new(Method::DELETE, action, segments)
  }

  /// GET an absolute URL
  pub fn absolute(action: &'static str, url: Url) -> Self {
    Self {
      method: Method::GET,
      target: Target::Absolute(url),
      params: Vec::new(),
      body: Body::Empty,
      action,
      forbidden: None,
    }
  }

  pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
    self.params.push((name, value.to_string()));
    self
  }

  pub fn params(mut self, params: impl IntoIterator<Item = (&'static str, String)>) -> Self {
    self.params.extend(params);
    self
  }

  pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
    self.body = Body::Json(serde_json::to_vec(body)?);
    Ok(self)
  }

  pub fn form(mut self, parts: Vec<FormPart>) -> Self {
    self.body = Body::Form(parts);
    self
  }

  pub fn forbidden(mut self, message: &'static str) -> Self {
    self.forbidden = Some(message);
    self
  }
}

/// A 2xx response with its body fully read
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  pub body: Bytes,
  pub content_type: Option<String>,
}

impl RawResponse {
  /// 204, or a body that is empty or whitespace
  pub fn is_empty(&self) -> bool {
    self.status == 204 || self.body.iter().all(u8::is_ascii_whitespace)
  }

  pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(&self.body)?)
  }

  /// Parse the body, or return `fallback` when there is nothing to parse.
  pub fn json_or<T: DeserializeOwned>(&self, fallback: T) -> Result<T, ApiError> {
    if self.is_empty() {
      Ok(fallback)
    } else {
      self.json()
    }
  }
}

#[derive(Deserialize)]
struct ErrorBody {
  message: Option<String>,
}

/// Map a non-2xx status and its body to an [`ApiError`].
///
/// The server's `message` field wins when present, except on 403 where a
/// request-specific permission message replaces it.
pub(crate) fn error_for_status(
  status: u16,
  body: &[u8],
  action: &str,
  forbidden: Option<&str>,
) -> ApiError {
  let server_message = serde_json::from_slice::<ErrorBody>(body)
    .ok()
    .and_then(|b| b.message)
    .filter(|m| !m.trim().is_empty());
  let fallback = || format!("Failed to {action}");

  match status {
    404 => ApiError::NotFound {
      message: server_message.unwrap_or_else(fallback),
    },
    403 => ApiError::Forbidden {
      message: forbidden
        .map(str::to_string)
        .or(server_message)
        .unwrap_or_else(fallback),
    },
    _ => ApiError::Http {
      status,
      message: server_message.unwrap_or_else(fallback),
    },
  }
}

/// Authenticated HTTP client for the Greenspace backend
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  session: Session,
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("base_url", &self.base_url.as_str())
      .field("authenticated", &self.session.is_authenticated())
      .finish_non_exhaustive()
  }
}

impl ApiClient {
  pub fn new(config: &Config, session: Session) -> color_eyre::Result<Self> {
    let timeout = config.api.connect_timeout_secs.map(Duration::from_secs);
    Self::build(&config.api.url, timeout, session)
  }

  pub fn build(
    base_url: &str,
    connect_timeout: Option<Duration>,
    session: Session,
  ) -> color_eyre::Result<Self> {
    use color_eyre::eyre::eyre;

    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API URL '{}': {}", base_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid API URL '{}': not a base URL", base_url));
    }

    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = connect_timeout {
      builder = builder.connect_timeout(timeout);
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      session,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  fn url_for(&self, request: &Request) -> Result<Url, ApiError> {
    let mut url = match &request.target {
      Target::Absolute(url) => url.clone(),
      Target::Segments(segments) => {
        let mut url = self.base_url.clone();
        url
          .path_segments_mut()
          .map_err(|_| ApiError::Transport(format!("cannot build URL from {}", self.base_url)))?
          .pop_if_empty()
          .extend(segments);
        url
      }
    };
    if !request.params.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(request.params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
  }

  /// Execute a request, returning the raw body of a 2xx response.
  ///
  /// Fails with `Unauthenticated` before touching the network when the
  /// session has no token.
  pub async fn send(&self, request: Request) -> Result<RawResponse, ApiError> {
    let token = self.session.token()?;
    let url = self.url_for(&request)?;
    debug!(method = %request.method, %url, "Issuing request");

    let mut builder = self
      .http
      .request(request.method.clone(), url.clone())
      .bearer_auth(token);
    builder = match request.body {
      Body::Empty => builder,
      Body::Json(bytes) => builder.header(CONTENT_TYPE, "application/json").body(bytes),
      Body::Form(parts) => builder.multipart(build_form(parts)?),
    };

    let response = builder.send().await.map_err(|e| {
      warn!(%url, error = %e, "Request failed to send");
      ApiError::from(e)
    })?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    let body = response.bytes().await?;

    if !(200..300).contains(&status) {
      let err = error_for_status(status, &body, request.action, request.forbidden);
      warn!(%url, status, error = %err, "Request returned an error status");
      return Err(err);
    }

    debug!(%url, status, bytes = body.len(), "Request complete");
    Ok(RawResponse {
      status,
      body,
      content_type,
    })
  }

  /// Send and parse a JSON body
  pub async fn fetch<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
    self.send(request).await?.json()
  }

  /// Send and parse a JSON body, using `fallback` when the body is empty
  pub async fn fetch_or<T: DeserializeOwned>(
    &self,
    request: Request,
    fallback: T,
  ) -> Result<T, ApiError> {
    self.send(request).await?.json_or(fallback)
  }

  /// Send and discard the body
  pub async fn execute(&self, request: Request) -> Result<(), ApiError> {
    self.send(request).await.map(|_| ())
  }

  /// Lookup where "nothing there" is a normal answer.
  ///
  /// 404 and empty bodies both resolve to `None`.
  pub async fn fetch_optional<T: DeserializeOwned>(
    &self,
    request: Request,
  ) -> Result<Option<T>, ApiError> {
    match self.send(request).await {
      Ok(response) if response.is_empty() => Ok(None),
      Ok(response) => response.json().map(Some),
      Err(ApiError::NotFound { .. }) => Ok(None),
      Err(e) => Err(e),
    }
  }
}

fn build_form(parts: Vec<FormPart>) -> Result<multipart::Form, ApiError> {
  let mut form = multipart::Form::new();
  for part in parts {
    form = match part {
      FormPart::Text { name, value } => form.text(name, value),
      FormPart::File { name, upload } => {
        let file = multipart::Part::bytes(upload.bytes.to_vec())
          .file_name(upload.file_name)
          .mime_str(&upload.mime)?;
        form.part(name, file)
      }
    };
  }
  Ok(form)
}

/// Fail with `MissingParameter` when a required string is blank.
pub(crate) fn require<'a>(value: &'a str, name: &'static str) -> Result<&'a str, ApiError> {
  if value.trim().is_empty() {
    Err(ApiError::MissingParameter(name))
  } else {
    Ok(value)
  }
}

#[cfg(test)]
pub(crate) mod test_server {
  //! In-process backend for client tests.

  use super::*;

  /// Serve `router` on an ephemeral port and return a client pointed at it.
  pub async fn spawn(router: axum::Router) -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router).await.unwrap();
    });
    ApiClient::build(
      &format!("http://{addr}"),
      None,
      Session::new(Some("test-token".into()), Some("amira".into())),
    )
    .unwrap()
  }

  /// Client with no token, pointed at an address nothing listens on
  pub fn anonymous() -> ApiClient {
    ApiClient::build("http://127.0.0.1:9", None, Session::default()).unwrap()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderMap, StatusCode, Uri};
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::{json, Value};

  #[test]
  fn test_error_prefers_server_message() {
    let err = error_for_status(500, br#"{"message":"Database unavailable"}"#, "fetch groups", None);
    assert_eq!(
      err,
      ApiError::Http {
        status: 500,
        message: "Database unavailable".into()
      }
    );
  }

  #[test]
  fn test_error_falls_back_on_empty_or_invalid_body() {
    let empty = error_for_status(502, b"", "fetch groups", None);
    assert_eq!(empty.to_string(), "Failed to fetch groups (HTTP 502)");

    let html = error_for_status(500, b"<html>oops</html>", "delete group", None);
    assert_eq!(html.to_string(), "Failed to delete group (HTTP 500)");

    let blank = error_for_status(400, br#"{"message":"  "}"#, "update group", None);
    assert_eq!(blank.to_string(), "Failed to update group (HTTP 400)");
  }

  #[test]
  fn test_forbidden_uses_action_message() {
    let err = error_for_status(
      403,
      br#"{"message":"Access Denied"}"#,
      "add comment",
      Some("You do not have permission to comment on this publication"),
    );
    assert_eq!(
      err,
      ApiError::Forbidden {
        message: "You do not have permission to comment on this publication".into()
      }
    );

    let plain = error_for_status(403, b"", "fetch group", None);
    assert_eq!(plain.to_string(), "Failed to fetch group");
  }

  #[test]
  fn test_not_found_maps_to_variant() {
    let err = error_for_status(404, b"", "fetch publication", None);
    assert!(matches!(err, ApiError::NotFound { .. }));
  }

  #[test]
  fn test_url_encodes_segments_and_params() {
    let client = ApiClient::build("http://localhost:8089/", None, Session::default()).unwrap();
    let request = Request::get("fetch user", ["u", "ana maria"]).param("q", "a&b");
    let url = client.url_for(&request).unwrap();
    assert_eq!(url.as_str(), "http://localhost:8089/u/ana%20maria?q=a%26b");
  }

  #[test]
  fn test_url_keeps_base_path() {
    let client = ApiClient::build("http://host/backend", None, Session::default()).unwrap();
    let url = client
      .url_for(&Request::get("fetch groups", ["api", "groups"]))
      .unwrap();
    assert_eq!(url.as_str(), "http://host/backend/api/groups");
  }

  #[test]
  fn test_json_or_uses_fallback_for_empty_body() {
    let response = RawResponse {
      status: 200,
      body: Bytes::from_static(b"  "),
      content_type: None,
    };
    assert_eq!(response.json_or(vec![1]).unwrap(), vec![1]);

    let no_content = RawResponse {
      status: 204,
      body: Bytes::new(),
      content_type: None,
    };
    assert!(no_content.json_or::<Option<i32>>(None).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_missing_token_fails_before_network() {
    let client = test_server::anonymous();
    let err = client
      .send(Request::get("fetch groups", ["api", "groups"]))
      .await
      .unwrap_err();
    assert_eq!(err, ApiError::Unauthenticated);
  }

  #[tokio::test]
  async fn test_send_attaches_bearer_and_params() {
    async fn echo(headers: HeaderMap, uri: Uri) -> Json<Value> {
      let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
      Json(json!({ "auth": auth, "query": uri.query().unwrap_or_default() }))
    }

    let client = test_server::spawn(Router::new().route("/api/echo", get(echo))).await;
    let body: Value = client
      .fetch(
        Request::get("echo", ["api", "echo"])
          .param("page", 2)
          .param("size", 10),
      )
      .await
      .unwrap();

    assert_eq!(body["auth"], "Bearer test-token");
    assert_eq!(body["query"], "page=2&size=10");
  }

  #[tokio::test]
  async fn test_error_status_surfaces_server_message() {
    let router = Router::new().route(
      "/api/boom",
      get(|| async {
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "message": "Database unavailable" })),
        )
      }),
    );
    let client = test_server::spawn(router).await;

    let err = client
      .fetch::<Value>(Request::get("fetch boom", ["api", "boom"]))
      .await
      .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Database unavailable (HTTP 500)");
  }

  #[tokio::test]
  async fn test_fetch_optional_treats_404_as_none() {
    let router = Router::new().route(
      "/api/missing",
      get(|| async { StatusCode::NOT_FOUND }),
    );
    let client = test_server::spawn(router).await;

    let found: Option<Value> = client
      .fetch_optional(Request::get("fetch missing", ["api", "missing"]))
      .await
      .unwrap();
    assert!(found.is_none());
  }

  #[tokio::test]
  async fn test_malformed_success_body_is_decode_error() {
    let router = Router::new().route("/api/garbled", get(|| async { "not json" }));
    let client = test_server::spawn(router).await;

    let err = client
      .fetch::<Value>(Request::get("fetch garbled", ["api", "garbled"]))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
  }

  #[test]
  fn test_require_rejects_blank() {
    assert_eq!(require("amira", "username"), Ok("amira"));
    assert_eq!(
      require(" ", "username"),
      Err(ApiError::MissingParameter("username"))
    );
  }
}

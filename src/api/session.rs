use super::error::ApiError;

/// Credentials for the signed-in user.
///
/// Passed explicitly into the client instead of living in global state. The
/// token itself is issued by the auth service and only read here.
#[derive(Debug, Clone, Default)]
pub struct Session {
  token: Option<String>,
  username: Option<String>,
}

impl Session {
  pub fn new(token: Option<String>, username: Option<String>) -> Self {
    Self {
      token: token.filter(|t| !t.trim().is_empty()),
      username: username.filter(|u| !u.trim().is_empty()),
    }
  }

  /// Bearer token, or `Unauthenticated` when the session has none.
  pub fn token(&self) -> Result<&str, ApiError> {
    self.token.as_deref().ok_or(ApiError::Unauthenticated)
  }

  pub fn is_authenticated(&self) -> bool {
    self.token.is_some()
  }

  pub fn username(&self) -> Option<&str> {
    self.username.as_deref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_blank_token_is_unauthenticated() {
    let session = Session::new(Some("  ".into()), None);
    assert!(!session.is_authenticated());
    assert_eq!(session.token(), Err(ApiError::Unauthenticated));
  }

  #[test]
  fn test_token_and_username() {
    let session = Session::new(Some("abc".into()), Some("amira".into()));
    assert_eq!(session.token(), Ok("abc"));
    assert_eq!(session.username(), Some("amira"));
  }
}

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::Session;
use crate::query::PageSize;

pub const DEFAULT_API_URL: &str = "http://localhost:8089";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Signed-in user, used by "my publications" and "my groups"
  pub username: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub lists: ListsConfig,
  /// Bearer token. Only ever read from the environment.
  #[serde(skip)]
  pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_api_url")]
  pub url: String,
  pub connect_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      connect_timeout_secs: None,
    }
  }
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a successful result is served without refetching
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Idle time after which unsubscribed entries are evicted
  #[serde(default = "default_gc_secs")]
  pub gc_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: default_gc_secs(),
    }
  }
}

fn default_stale_secs() -> u64 {
  60
}

fn default_gc_secs() -> u64 {
  300
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListsConfig {
  /// Initial page size; snapped to one of 5, 10, 20, 50
  #[serde(default, deserialize_with = "deserialize_page_size")]
  pub page_size: PageSize,
}

fn deserialize_page_size<'de, D>(deserializer: D) -> Result<PageSize, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let size = u32::deserialize(deserializer)?;
  Ok(PageSize::new(size))
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_secs)
  }

  pub fn gc_time(&self) -> Duration {
    Duration::from_secs(self.gc_secs)
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./greenspace.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/greenspace/config.yaml
  ///
  /// With no file found the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    Ok(config.with_env(|name| std::env::var(name).ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("greenspace.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("greenspace").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Apply `GREENSPACE_API_URL`, `GREENSPACE_TOKEN` and `GREENSPACE_USERNAME`.
  fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
    let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());
    if let Some(url) = var("GREENSPACE_API_URL") {
      self.api.url = url;
    }
    if let Some(token) = var("GREENSPACE_TOKEN") {
      self.token = Some(token);
    }
    if let Some(username) = var("GREENSPACE_USERNAME") {
      self.username = Some(username);
    }
    self
  }

  pub fn session(&self) -> Session {
    Session::new(self.token.clone(), self.username.clone())
  }

  /// Directory for the log file
  pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
      .unwrap_or_else(std::env::temp_dir)
      .join("greenspace")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert_eq!(config.cache.stale_secs, 60);
    assert_eq!(config.cache.gc_secs, 300);
    assert_eq!(config.lists.page_size.get(), 10);
    assert!(config.username.is_none());
  }

  #[test]
  fn test_partial_file() {
    let config = Config::parse(
      "api:\n  url: https://greenspace.example.com\n  connect_timeout_secs: 5\nusername: amira\nlists:\n  page_size: 20\n",
    )
    .unwrap();
    assert_eq!(config.api.url, "https://greenspace.example.com");
    assert_eq!(config.api.connect_timeout_secs, Some(5));
    assert_eq!(config.username.as_deref(), Some("amira"));
    assert_eq!(config.lists.page_size.get(), 20);
    assert_eq!(config.cache.stale_secs, 60);
  }

  #[test]
  fn test_unsupported_page_size_snaps_to_default() {
    let config = Config::parse("lists:\n  page_size: 7\n").unwrap();
    assert_eq!(config.lists.page_size.get(), 10);
  }

  #[test]
  fn test_token_is_not_read_from_file() {
    let config = Config::parse("token: secret\n").unwrap();
    assert!(config.token.is_none());
  }

  #[test]
  fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
      ("GREENSPACE_API_URL", "http://10.0.0.2:8089"),
      ("GREENSPACE_TOKEN", "abc"),
      ("GREENSPACE_USERNAME", ""),
    ]
    .into_iter()
    .collect();
    let config = Config {
      username: Some("amira".into()),
      ..Config::default()
    }
    .with_env(|name| env.get(name).map(|v| v.to_string()));

    assert_eq!(config.api.url, "http://10.0.0.2:8089");
    assert_eq!(config.token.as_deref(), Some("abc"));
    // Blank values do not override
    assert_eq!(config.username.as_deref(), Some("amira"));
    assert!(config.session().is_authenticated());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let err = Config::load(Some(Path::new("/nonexistent/greenspace.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}

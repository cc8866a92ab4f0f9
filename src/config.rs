use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API root used when neither the config file nor the environment set one.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Freshness window for directory list reads
  #[serde(default = "default_list_stale_secs")]
  pub list_stale_secs: u64,
  /// Freshness window for single-record reads (0 = always revalidate)
  #[serde(default)]
  pub detail_stale_secs: u64,
  /// Freshness window for department searches (0 = always revalidate)
  #[serde(default)]
  pub department_stale_secs: u64,
  /// Automatic retries for failed reads
  #[serde(default = "default_retry")]
  pub retry: u32,
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      list_stale_secs: default_list_stale_secs(),
      detail_stale_secs: 0,
      department_stale_secs: 0,
      retry: default_retry(),
      retry_delay_ms: default_retry_delay_ms(),
    }
  }
}

impl CacheConfig {
  pub fn list_stale_time(&self) -> Duration {
    Duration::from_secs(self.list_stale_secs)
  }

  pub fn detail_stale_time(&self) -> Duration {
    Duration::from_secs(self.detail_stale_secs)
  }

  pub fn department_stale_time(&self) -> Duration {
    Duration::from_secs(self.department_stale_secs)
  }

  pub fn retry_delay(&self) -> Duration {
    Duration::from_millis(self.retry_delay_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Delay before the automatic redirect that follows a successful form submit
  #[serde(default = "default_redirect_delay_secs")]
  pub redirect_delay_secs: u64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      title: None,
      redirect_delay_secs: default_redirect_delay_secs(),
    }
  }
}

impl UiConfig {
  pub fn redirect_delay(&self) -> Duration {
    Duration::from_secs(self.redirect_delay_secs)
  }
}

fn default_base_url() -> String {
  DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_list_stale_secs() -> u64 {
  5 * 60
}

fn default_retry() -> u32 {
  1
}

fn default_retry_delay_ms() -> u64 {
  1000
}

fn default_redirect_delay_secs() -> u64 {
  5
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./staffdir.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/staffdir/config.yaml
  ///
  /// Unlike an explicit path, a missing default file just yields the defaults.
  /// `STAFFDIR_API_URL` overrides whatever base URL the file sets.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("STAFFDIR_API_URL") {
      config.api.base_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("staffdir.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("staffdir").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Point at another API root, e.g. from the command line.
  pub fn with_base_url(mut self, base_url: String) -> Result<Self> {
    self.api.base_url = base_url;
    self.validate()?;
    Ok(self)
  }

  fn validate(&self) -> Result<()> {
    url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.api.base_url, e))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_yaml_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.api.base_url, DEFAULT_API_URL);
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.cache.list_stale_time(), Duration::from_secs(300));
    assert_eq!(config.cache.detail_stale_time(), Duration::ZERO);
    assert_eq!(config.cache.retry, 1);
    assert_eq!(config.ui.redirect_delay(), Duration::from_secs(5));
    assert!(config.ui.title.is_none());
  }

  #[test]
  fn test_partial_sections() {
    let yaml = r#"
api:
  base_url: "https://hr.example.com/api/v1"
cache:
  retry: 0
ui:
  title: "Acme HR"
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.api.base_url, "https://hr.example.com/api/v1");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.cache.retry, 0);
    assert_eq!(config.cache.list_stale_secs, 300);
    assert_eq!(config.ui.title.as_deref(), Some("Acme HR"));
  }

  #[test]
  fn test_invalid_base_url_rejected() {
    let mut config = Config::default();
    config.api.base_url = "not a url".to_string();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_with_base_url_validates() {
    let config = Config::default()
      .with_base_url("http://10.0.0.5:3000/api/v1".to_string())
      .unwrap();
    assert_eq!(config.api.base_url, "http://10.0.0.5:3000/api/v1");

    assert!(Config::default().with_base_url("nope".to_string()).is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let result = Config::load(Some(Path::new("/definitely/not/here.yaml")));
    assert!(result.is_err());
  }
}

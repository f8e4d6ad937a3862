//! Flowstate Config
//!
//! This crate contains the serializable runner configuration for flowstate.
//! A [`RunnerConfig`] is handed to the task and flow runners explicitly; there
//! is no process-global configuration.
//!
//! Configuration can be loaded from:
//! - JSON files (via [`RunnerConfig::from_path`])
//! - JSON strings (via [`RunnerConfig::from_json_str`])
//! - Environment variables layered on top of either (via [`RunnerConfig::with_env_overrides`])

mod error;

pub use error::ConfigError;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable for [`RunnerConfig::raise_on_error`].
pub const ENV_RAISE_ON_ERROR: &str = "FLOWSTATE_RAISE_ON_ERROR";
/// Environment variable for [`RunnerConfig::skipped_is_success`].
pub const ENV_SKIPPED_IS_SUCCESS: &str = "FLOWSTATE_SKIPPED_IS_SUCCESS";
/// Environment variable for [`RunnerConfig::max_concurrency`].
pub const ENV_MAX_CONCURRENCY: &str = "FLOWSTATE_MAX_CONCURRENCY";

/// Settings shared by the task runner and the flow runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
  /// Return task body failures as errors instead of capturing them into a
  /// `Failed` state. Meant for debugging.
  pub raise_on_error: bool,
  /// Treat `Skipped` tasks as successful when aggregating a flow state.
  pub skipped_is_success: bool,
  /// Upper bound on tasks executing at once within a ready batch.
  /// `None` runs the whole batch concurrently; `Some(1)` runs sequentially.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<usize>,
}

impl RunnerConfig {
  /// Parse a configuration from a JSON document. Missing keys take their defaults.
  pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  /// Load a configuration from a JSON file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json_str(&content)
  }

  /// Layer `FLOWSTATE_*` environment variables over this configuration.
  pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
    self.with_overrides(|key| std::env::var(key).ok())
  }

  /// Layer overrides from an arbitrary lookup over this configuration.
  ///
  /// `lookup` is called with each `FLOWSTATE_*` key; `None` leaves the
  /// current value untouched.
  pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(value) = lookup(ENV_RAISE_ON_ERROR) {
      self.raise_on_error = parse_bool(ENV_RAISE_ON_ERROR, &value)?;
    }
    if let Some(value) = lookup(ENV_SKIPPED_IS_SUCCESS) {
      self.skipped_is_success = parse_bool(ENV_SKIPPED_IS_SUCCESS, &value)?;
    }
    if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
      let value = value.trim();
      self.max_concurrency = if value.is_empty() {
        None
      } else {
        Some(value.parse().map_err(|_| ConfigError::InvalidValue {
          key: ENV_MAX_CONCURRENCY.to_string(),
          value: value.to_string(),
        })?)
      };
    }
    self.validate()?;
    Ok(self)
  }

  /// Builder-style setter for [`RunnerConfig::raise_on_error`].
  pub fn raise_on_error(mut self, raise: bool) -> Self {
    self.raise_on_error = raise;
    self
  }

  /// Builder-style setter for [`RunnerConfig::skipped_is_success`].
  pub fn skipped_is_success(mut self, skipped_is_success: bool) -> Self {
    self.skipped_is_success = skipped_is_success;
    self
  }

  /// Builder-style setter for [`RunnerConfig::max_concurrency`].
  pub fn max_concurrency(mut self, limit: Option<usize>) -> Self {
    self.max_concurrency = limit;
    self
  }

  /// Check the configuration for values the runners cannot honor.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_concurrency == Some(0) {
      return Err(ConfigError::ZeroConcurrency);
    }
    Ok(())
  }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(ConfigError::InvalidValue {
      key: key.to_string(),
      value: value.to_string(),
    }),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;
  use std::io::Write;

  use super::*;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn test_defaults() {
    let config = RunnerConfig::default();
    assert!(!config.raise_on_error);
    assert!(!config.skipped_is_success);
    assert_eq!(config.max_concurrency, None);
  }

  #[test]
  fn test_partial_json_uses_defaults() {
    let config = RunnerConfig::from_json_str(r#"{ "raise_on_error": true }"#).unwrap();
    assert!(config.raise_on_error);
    assert!(!config.skipped_is_success);
    assert_eq!(config.max_concurrency, None);
  }

  #[test]
  fn test_zero_concurrency_rejected() {
    let result = RunnerConfig::from_json_str(r#"{ "max_concurrency": 0 }"#);
    assert!(matches!(result, Err(ConfigError::ZeroConcurrency)));
  }

  #[test]
  fn test_invalid_json() {
    let result = RunnerConfig::from_json_str("{ not json");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
  }

  #[test]
  fn test_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "skipped_is_success": true, "max_concurrency": 4 }}"#).unwrap();

    let config = RunnerConfig::from_path(file.path()).unwrap();
    assert!(config.skipped_is_success);
    assert_eq!(config.max_concurrency, Some(4));
  }

  #[test]
  fn test_from_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let result = RunnerConfig::from_path(dir.path().join("missing.json"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
  }

  #[test]
  fn test_overrides() {
    let config = RunnerConfig::default()
      .with_overrides(lookup(&[
        (ENV_RAISE_ON_ERROR, "TRUE"),
        (ENV_SKIPPED_IS_SUCCESS, "yes"),
        (ENV_MAX_CONCURRENCY, "2"),
      ]))
      .unwrap();

    assert!(config.raise_on_error);
    assert!(config.skipped_is_success);
    assert_eq!(config.max_concurrency, Some(2));
  }

  #[test]
  fn test_empty_concurrency_override_clears_limit() {
    let config = RunnerConfig::default()
      .max_concurrency(Some(3))
      .with_overrides(lookup(&[(ENV_MAX_CONCURRENCY, "")]))
      .unwrap();
    assert_eq!(config.max_concurrency, None);
  }

  #[test]
  fn test_invalid_override() {
    let result = RunnerConfig::default().with_overrides(lookup(&[(ENV_RAISE_ON_ERROR, "maybe")]));
    match result {
      Err(ConfigError::InvalidValue { key, value }) => {
        assert_eq!(key, ENV_RAISE_ON_ERROR);
        assert_eq!(value, "maybe");
      }
      other => panic!("expected InvalidValue, got {:?}", other),
    }
  }
}

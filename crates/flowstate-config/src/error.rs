use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid value for {key}: '{value}'")]
  InvalidValue { key: String, value: String },

  #[error("max_concurrency must be at least 1")]
  ZeroConcurrency,
}

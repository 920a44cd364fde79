use std::path::PathBuf;

use thiserror::Error;

pub mod settings;
pub mod validation;

pub use settings::Settings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value '{0}'")]
    Missing(String),

    #[error("invalid configuration at '{key}': {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

//! YAML-backed typed configuration.
//!
//! Fixtures are plain `serde` structs; these helpers only add uniform error
//! reporting on top of `serde_yaml`.

use std::path::Path;

use serde::de::DeserializeOwned;

/// A single validation error detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationDetail {
    pub key: String,
    pub message: String,
}

impl ConfigValidationDetail {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O or YAML parsing error occurred while loading config.
    Load(String),
    /// The configuration parsed but is semantically invalid.
    Validation(Vec<ConfigValidationDetail>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Validation(details) => {
                write!(f, "Config validation errors:")?;
                for detail in details {
                    write!(f, "\n  - {}: {}", detail.key, detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Turn a list of collected details into a result.
pub fn validation_result(details: Vec<ConfigValidationDetail>) -> Result<(), ConfigError> {
    if details.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(details))
    }
}

/// Deserialize a typed config value from a YAML string.
pub fn from_yaml_str<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and deserialize a typed config value from a YAML file.
pub fn from_yaml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    from_yaml_str(&content)
}

//! Settings errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Cannot write config {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Cannot create config directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// A value parsed but makes no sense for a map
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Cannot encode TOML config: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SettingsError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Problems with the config file as a whole
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config files must be .json or .toml, got {0}")]
    UnsupportedFormat(String),

    #[error("{key} = {value} is out of range")]
    ValueOutOfRange { key: String, value: String },

    #[error("No configuration directory on this platform")]
    NoConfigDir,
}

pub type SettingsResult<T> = Result<T, SettingsError>;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::KeyFileError;

pub const APP_NAME: &str = "ssb";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SECRET_FILE_NAME: &str = "secret";

/// Where a node keeps its identity, and how to create one
///
/// ```toml
/// path = "/home/alice/.ssb"
/// curve = "ed25519"
/// legacy = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Directory holding the `secret` file
    pub path: PathBuf,
    /// Curve for newly created keys, the registry's primary curve if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    /// Write only the private key tag instead of the JSON keys
    #[serde(default)]
    pub legacy: bool,
}

impl KeysConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            curve: None,
            legacy: false,
        }
    }

    /// Get the identity directory (custom or default ~/.ssb)
    pub fn dir(custom_path: Option<PathBuf>) -> Result<PathBuf, KeyFileError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(KeyFileError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Config for the default directory
    pub fn default_location() -> Result<Self, KeyFileError> {
        Ok(Self::new(Self::dir(None)?))
    }

    pub fn secret_path(&self) -> PathBuf {
        self.path.join(SECRET_FILE_NAME)
    }

    /// Read a config file
    ///
    /// A relative `path` inside the file is taken relative to the file's
    /// own directory.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self, KeyFileError> {
        let config_path = config_path.as_ref();
        let config_toml = fs::read_to_string(config_path)?;
        let mut config: KeysConfig = toml::from_str(&config_toml)?;
        if config.path.is_relative() {
            if let Some(parent) = config_path.parent() {
                config.path = parent.join(&config.path);
            }
        }
        Ok(config)
    }

    /// Write this config as `config.toml` inside its own directory
    pub fn save(&self) -> Result<PathBuf, KeyFileError> {
        fs::create_dir_all(&self.path)?;
        let config_path = self.path.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(self)?)?;
        Ok(config_path)
    }
}

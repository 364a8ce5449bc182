// Application configuration file located through SMRT_CONFIGURATION

use crate::{ConfigError, ConfigLoader, ConfigManager, FileFormat, Result, Validate};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable holding the path of the configuration file.
pub const CONFIGURATION_ENV: &str = "SMRT_CONFIGURATION";

/// The configuration document an application was started with.
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    path: PathBuf,
    values: Value,
}

impl ApplicationConfig {
    /// Read the file named by `SMRT_CONFIGURATION`.
    ///
    /// `Ok(None)` when the variable is unset or the file does not exist;
    /// an unreadable or malformed file is an error.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var_os(CONFIGURATION_ENV) {
            Some(path) => {
                info!(path = ?path, "using application configuration");
                Self::from_path(PathBuf::from(path))
            }
            None => {
                info!("{} not set, running without configuration", CONFIGURATION_ENV);
                Ok(None)
            }
        }
    }

    /// Read `path`; `Ok(None)` if it does not exist. Files without a known
    /// extension are read as JSON.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Option<Self>> {
        let path = path.into();
        if !path.is_file() {
            info!(path = %path.display(), "no configuration file found");
            return Ok(None);
        }

        let format = FileFormat::from_path(&path).unwrap_or(FileFormat::Json);
        let values = ConfigLoader::new(format).load_file(&path)?;
        debug!(path = %path.display(), ?format, "configuration file read");

        Ok(Some(Self { path, values }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    /// One top-level value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.values.clone())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Deserialize into `T` and run its validation.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let config: T = self.deserialize()?;
        config.validate()?;
        info!(path = %self.path.display(), "configuration read and verified");
        Ok(config)
    }

    /// A [`ConfigManager`] seeded with this document.
    pub fn into_manager(self) -> ConfigManager {
        let manager = ConfigManager::new();
        manager.merge_value(self.values);
        manager
    }
}

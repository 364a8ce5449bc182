// Layered key/value configuration store

use crate::{ConfigError, ConfigLoader, EnvLoader, FileFormat, Result, Validate};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Configuration values merged from files, `.env` and the environment.
///
/// Later loads override earlier ones key by key. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    values: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only environment variables starting with `prefix_` are loaded.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    pub fn load_env(&self) -> Result<()> {
        let loaded = EnvLoader::new(self.env_prefix.clone()).load();
        let mut values = self.values.write();
        for (key, value) in loaded {
            values.insert(key, Value::String(value));
        }
        Ok(())
    }

    /// Load a `.env` file into the process environment, then [`load_env`].
    /// Without a path, a missing `./.env` is ignored.
    ///
    /// [`load_env`]: ConfigManager::load_env
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                if let Err(e) = dotenvy::dotenv()
                    && !e.not_found()
                {
                    return Err(ConfigError::LoadError(e.to_string()));
                }
            }
        }
        self.load_env()
    }

    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    /// Load a file, picking the format from its extension.
    pub fn load_file_auto(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    pub(crate) fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            self.values.write().extend(map);
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    /// Typed lookup. Dotted keys (`db.host`) descend into nested objects
    /// when no flat key of that name exists.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let values = self.values.read();
        if let Some(value) = values.get(key) {
            return Some(value.clone());
        }

        let mut parts = key.split('.');
        let mut current = values.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current.clone())
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Copy every value of `other` into this store.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.values, &other.values) {
            return;
        }
        let theirs = other.values.read().clone();
        self.values.write().extend(theirs);
    }

    /// The whole store as one JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.read().clone())
    }

    /// Deserialize the whole store into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Deserialize into `T` and run its validation.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let config: T = self.deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Reads process environment variables, optionally restricted to a prefix.
///
/// With prefix `HELLO`, `HELLO_DB_URL` is exposed as `db_url`.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(Some(prefix.into()))
    }

    /// All matching variables with the prefix stripped and keys lowercased.
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        vars.filter_map(|(key, value)| {
            let key = match &self.prefix {
                Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix('_')?.to_string(),
                None => key,
            };
            (!key.is_empty()).then(|| (key.to_lowercase(), value))
        })
        .collect()
    }

    /// Name of the variable backing `key`.
    pub fn var_name(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// One variable, looked up as `PREFIX_KEY`.
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_prefix_is_stripped() {
        let loader = EnvLoader::with_prefix("HELLO");
        let loaded = loader.collect(vars(&[
            ("HELLO_DB_URL", "postgres://db"),
            ("HELLO_PORT", "8080"),
            ("HELLOWORLD", "x"),
            ("HELLO_", "empty key"),
            ("PATH", "/bin"),
        ]));

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("db_url").map(String::as_str), Some("postgres://db"));
        assert_eq!(loaded.get("port").map(String::as_str), Some("8080"));
    }

    #[test]
    fn test_no_prefix_keeps_everything() {
        let loaded = EnvLoader::default().collect(vars(&[("A", "1"), ("B_C", "2")]));
        assert_eq!(loaded.get("b_c").map(String::as_str), Some("2"));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_var_name_and_missing() {
        let loader = EnvLoader::with_prefix("SMRT_TEST");
        assert_eq!(loader.var_name("port"), "SMRT_TEST_PORT");
        assert!(matches!(
            loader.load_var("MISSING_VAR_67890"),
            Err(ConfigError::EnvError(_))
        ));
        assert_eq!(loader.load_var_or("MISSING_VAR_67890", "fallback"), "fallback");
    }
}

// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Implemented by application configuration types checked after loading.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable checks for `Validate` implementations.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(invalid(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq + Display>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            let allowed = allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(invalid(format!(
                "{} must be one of [{}], got {}",
                field, allowed, value
            )));
        }
        Ok(())
    }

    /// `http://` or `https://` followed by a host
    pub fn is_url(value: &str, field: &str) -> Result<()> {
        let host = value
            .strip_prefix("http://")
            .or_else(|| value.strip_prefix("https://"));
        match host {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
            _ => Err(invalid(format!("{} must be an http(s) URL", field))),
        }
    }

    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(invalid(format!("{} must be a valid port number", field)));
        }
        Ok(())
    }

    /// Every key in `keys` is present in the JSON object `value`.
    pub fn has_keys(value: &serde_json::Value, keys: &[&str]) -> Result<()> {
        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|key| value.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(invalid(format!("missing keys: {}", missing.join(", "))));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::ValidationError(message)
}

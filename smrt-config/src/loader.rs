// Configuration file parsing

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Format implied by the file name. `.env` dotfiles count as `Env`.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|n| n.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Parses configuration documents into a JSON object.
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension.
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        FileFormat::from_path(path).map(Self::new).ok_or_else(|| {
            ConfigError::LoadError(format!(
                "cannot tell the format of '{}' from its extension",
                path.display()
            ))
        })
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("failed to read '{}': {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    /// Parse a document. The top level must be an object.
    pub fn parse(&self, content: &str) -> Result<Value> {
        let value = match self.format {
            FileFormat::Json => parse_json(content)?,
            FileFormat::Toml => parse_toml(content)?,
            FileFormat::Env => parse_env(content),
        };

        if !value.is_object() {
            return Err(ConfigError::ParseError(
                "configuration must be an object at the top level".to_string(),
            ));
        }
        Ok(value)
    }
}

fn parse_json(content: &str) -> Result<Value> {
    serde_json::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
}

fn parse_toml(content: &str) -> Result<Value> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    serde_json::to_value(table).map_err(|e| ConfigError::SerializationError(e.to_string()))
}

/// `KEY=value` lines; blank lines, `#` comments and an `export ` prefix are
/// skipped, surrounding quotes are stripped.
fn parse_env(content: &str) -> Value {
    let map = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key.trim().to_string(), Value::String(value.to_string())))
        })
        .collect();

    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let value = ConfigLoader::new(FileFormat::Json)
            .parse(r#"{"port": 8080, "db": {"host": "localhost"}}"#)
            .unwrap();
        assert_eq!(value["port"], 8080);
        assert_eq!(value["db"]["host"], "localhost");
    }

    #[test]
    fn test_parse_toml_nested() {
        let value = ConfigLoader::new(FileFormat::Toml)
            .parse(
                r#"
                name = "hello"
                [db]
                port = 5432
                "#,
            )
            .unwrap();
        assert_eq!(value["name"], "hello");
        assert_eq!(value["db"]["port"], 5432);
    }

    #[test]
    fn test_parse_env() {
        let value = ConfigLoader::new(FileFormat::Env)
            .parse(
                r#"
                # comment
                KEY=value
                export EXPORTED=1
                QUOTED="quoted value"
                SINGLE='single'
                not a pair
                "#,
            )
            .unwrap();
        assert_eq!(value["KEY"], "value");
        assert_eq!(value["EXPORTED"], "1");
        assert_eq!(value["QUOTED"], "quoted value");
        assert_eq!(value["SINGLE"], "single");
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_rejects_non_object_and_garbage() {
        let json = ConfigLoader::new(FileFormat::Json);
        assert!(matches!(json.parse("[1, 2]"), Err(ConfigError::ParseError(_))));
        assert!(matches!(json.parse("{"), Err(ConfigError::ParseError(_))));
        assert!(matches!(
            ConfigLoader::new(FileFormat::Toml).parse("= nope"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert_eq!(
            FileFormat::from_path(Path::new("/etc/app/.env")),
            Some(FileFormat::Env)
        );
        assert_eq!(
            ConfigLoader::auto("config.toml").unwrap().format(),
            FileFormat::Toml
        );
        assert!(ConfigLoader::auto("config").is_err());
    }
}

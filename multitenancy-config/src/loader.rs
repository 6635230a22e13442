// Configuration file loaders

use crate::{ConfigError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load raw configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::LoadError(format!("Failed to read file: {}", e)))?;

        self.parse(&content)
    }

    /// Load a file straight into a typed configuration
    pub fn load_typed<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T> {
        let value = self.load_file(path)?;
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Json => self.parse_json(content),
            FileFormat::Toml => self.parse_toml(content),
            FileFormat::Env => self.parse_env(content),
        }
    }

    fn parse_json(&self, content: &str) -> Result<Value> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
    }

    fn parse_toml(&self, content: &str) -> Result<Value> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        serde_json::to_value(toml_value)
            .map_err(|e| ConfigError::ParseError(format!("TOML to JSON conversion error: {}", e)))
    }

    // Flat `KEY=value` pairs; dotted keys (`providers.database.table`) nest.
    fn parse_env(&self, content: &str) -> Result<Value> {
        let mut root = serde_json::Map::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                insert_dotted(&mut root, &key, env_value(value))?;
            }
        }

        Ok(Value::Object(root))
    }
}

/// Interpret a flat string value: comma lists become arrays.
fn env_value(raw: &str) -> Value {
    if raw.contains(',') {
        Value::Array(
            raw.split(',')
                .map(|s| Value::String(s.trim().to_string()))
                .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                .collect(),
        )
    } else {
        Value::String(raw.to_string())
    }
}

pub(crate) fn insert_dotted(
    root: &mut serde_json::Map<String, Value>,
    key: &str,
    value: Value,
) -> Result<()> {
    let mut parts = key.split('.').peekable();
    let mut current = root;

    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return Ok(());
        }

        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));

        current = entry.as_object_mut().ok_or_else(|| {
            ConfigError::ParseError(format!("Key '{}' is both a value and a table", part))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let json = r#"{"provider": "database", "providers": {"database": {"table": "tenants"}}}"#;

        let result = loader.parse(json).unwrap();
        assert_eq!(result["providers"]["database"]["table"], "tenants");
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            provider = "database"

            [providers.database]
            table = "tenants"
            identifiers = ["id", "slug"]
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["provider"], "database");
        assert_eq!(result["providers"]["database"]["identifiers"][1], "slug");
    }

    #[test]
    fn test_parse_env_nests_dotted_keys() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = r#"
            PROVIDER=database
            # Comment
            PROVIDERS.DATABASE.TABLE="tenants"
            PROVIDERS.DATABASE.IDENTIFIERS=id, slug
        "#;

        let result = loader.parse(env).unwrap();
        assert_eq!(result["provider"], "database");
        assert_eq!(result["providers"]["database"]["table"], "tenants");
        assert_eq!(
            result["providers"]["database"]["identifiers"],
            serde_json::json!(["id", "slug"])
        );
    }

    #[test]
    fn test_parse_env_conflicting_keys() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = "PROVIDER=database\nPROVIDER.TABLE=tenants";

        assert!(loader.parse(env).is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("env"), Some(FileFormat::Env));
        assert_eq!(FileFormat::from_extension("yaml"), None);

        assert_eq!(
            ConfigLoader::auto("config/multitenancy.toml").unwrap().format(),
            FileFormat::Toml
        );
        assert!(ConfigLoader::auto("multitenancy").is_err());
    }
}

// Environment variable loading

use crate::loader::insert_dotted;
use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Default prefix for multitenancy environment variables
pub const ENV_PREFIX: &str = "MULTITENANCY";

/// Environment variable loader
///
/// `MULTITENANCY_PROVIDERS__DATABASE__TABLE=tenants` maps to the nested key
/// `providers.database.table`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables as flat, lowercase keys
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let key = match &self.prefix {
                Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if rest.starts_with('_') => rest.trim_start_matches('_'),
                    _ => continue,
                },
                None => key.as_str(),
            };
            config.insert(key.replace("__", ".").to_lowercase(), value);
        }

        config
    }

    /// Load matching environment variables as a nested JSON object
    pub fn load_nested(&self) -> Result<Value> {
        self.nest(self.load())
    }

    fn nest(&self, flat: HashMap<String, String>) -> Result<Value> {
        let mut root = serde_json::Map::new();
        let mut keys: Vec<_> = flat.into_iter().collect();
        keys.sort();

        for (key, value) in keys {
            let value = if key.ends_with("identifiers") {
                Value::Array(
                    value
                        .split(',')
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                )
            } else {
                Value::String(value)
            };
            insert_dotted(&mut root, &key, value)?;
        }

        Ok(Value::Object(root))
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }
}

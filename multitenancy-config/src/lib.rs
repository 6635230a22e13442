// Configuration management for the multitenancy crates

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::{ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{
    AuthConfig, DATABASE_USER_PROVIDER_DRIVER, GuardConfig, MODEL_DRIVER, MultitenancyConfig,
    ProviderConfig, SESSION_GUARD_DRIVER, TABLE_DRIVER, UserProviderConfig,
};
pub use validation::{ConfigValidator, Validate};

use serde_json::Value;
use std::path::PathBuf;

/// Builder that layers configuration sources and validates the result
///
/// Later sources override earlier ones: defaults, then files in the order
/// they were added, then environment variables.
///
/// ```rust,ignore
/// let config = ConfigBuilder::new()
///     .add_file("config/multitenancy.toml")
///     .load_env()
///     .build()?;
/// ```
pub struct ConfigBuilder {
    files: Vec<(PathBuf, Option<FileFormat>)>,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    env_prefix: String,
    overrides: Vec<Value>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            env_prefix: ENV_PREFIX.to_string(),
            overrides: Vec::new(),
        }
    }

    /// Add a configuration file; the format is taken from its extension
    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), None));
        self
    }

    /// Add a configuration file with an explicit format
    pub fn add_file_with_format(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.files.push((path.into(), Some(format)));
        self
    }

    /// Layer an in-memory JSON value over the file sources
    pub fn add_value(mut self, value: Value) -> Self {
        self.overrides.push(value);
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Set the environment variable prefix (default `MULTITENANCY`)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load a `.env` file into the process environment before reading it
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Merge every source and validate the resulting configuration
    pub fn build(self) -> Result<MultitenancyConfig> {
        let mut merged = serde_json::to_value(MultitenancyConfig::default())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        for (path, format) in &self.files {
            let loader = match format {
                Some(format) => ConfigLoader::new(*format),
                None => ConfigLoader::auto(path)?,
            };
            merge(&mut merged, loader.load_file(path)?);
        }

        for value in self.overrides {
            merge(&mut merged, value);
        }

        if self.load_dotenv {
            match &self.dotenv_path {
                Some(path) => {
                    dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
                }
                None => {
                    // A missing .env is not an error
                    dotenvy::dotenv().ok();
                }
            }
        }

        if self.load_env || self.load_dotenv {
            let loader = EnvLoader::new(Some(self.env_prefix.clone()));
            merge(&mut merged, loader.load_nested()?);
        }

        let config: MultitenancyConfig = serde_json::from_value(merged)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `overlay` into `base`; objects merge key by key, anything else replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

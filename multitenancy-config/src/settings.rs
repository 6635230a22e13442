// Typed multitenancy settings

use crate::{ConfigError, ConfigValidator, Result, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Driver name of the model-backed tenant provider
pub const MODEL_DRIVER: &str = "eloquent";

/// Driver name of the table-backed tenant provider
pub const TABLE_DRIVER: &str = "database";

/// Driver name of the tenant-aware session guard
pub const SESSION_GUARD_DRIVER: &str = "session.multi";

/// Driver name of the tenant-aware database user provider
pub const DATABASE_USER_PROVIDER_DRIVER: &str = "database.multi";

/// Top-level multitenancy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MultitenancyConfig {
    /// Name of the provider used when none is requested explicitly
    pub provider: String,

    /// Provider options keyed by provider name
    pub providers: HashMap<String, ProviderConfig>,

    /// Prefix of the default database-per-tenant parser
    pub connection_prefix: String,

    /// Guards and user providers
    pub auth: AuthConfig,
}

impl Default for MultitenancyConfig {
    fn default() -> Self {
        Self {
            provider: MODEL_DRIVER.to_string(),
            providers: HashMap::new(),
            connection_prefix: "tenant_".to_string(),
            auth: AuthConfig::default(),
        }
    }
}

impl MultitenancyConfig {
    /// Create a config whose default provider is `provider`
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Add provider options under `name`
    pub fn with_provider(mut self, name: impl Into<String>, config: ProviderConfig) -> Self {
        self.providers.insert(name.into(), config);
        self
    }

    /// Replace the auth section
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Options for the named provider
    pub fn provider_config(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}

impl Validate for MultitenancyConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.provider, "provider")?;
        ConfigValidator::not_empty(&self.connection_prefix, "connection_prefix")?;

        if !self.providers.contains_key(&self.provider) {
            return Err(ConfigError::ValidationError(format!(
                "default provider '{}' has no entry under providers",
                self.provider
            )));
        }

        for (name, provider) in &self.providers {
            provider.validate_as(name)?;
        }

        self.auth.validate()
    }
}

/// Options for one tenant provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Driver to build the provider with; defaults to the provider's name
    pub driver: Option<String>,

    /// Model descriptor name (model-backed driver)
    pub model: Option<String>,

    /// Tenant table (table-backed driver)
    pub table: Option<String>,

    /// Columns tried in order when looking a tenant up (table-backed driver)
    pub identifiers: Vec<String>,

    /// Column holding the tenant id; defaults to `id`
    pub key: Option<String>,
}

impl ProviderConfig {
    /// Options for the model-backed driver
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            driver: Some(MODEL_DRIVER.to_string()),
            model: Some(model.into()),
            ..Self::default()
        }
    }

    /// Options for the table-backed driver
    pub fn table<I, S>(table: impl Into<String>, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            driver: Some(TABLE_DRIVER.to_string()),
            table: Some(table.into()),
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the tenant id column
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Driver name, falling back to the provider name
    pub fn driver_or<'a>(&'a self, name: &'a str) -> &'a str {
        self.driver.as_deref().unwrap_or(name)
    }

    /// Tenant id column
    pub fn key_column(&self) -> &str {
        self.key.as_deref().unwrap_or("id")
    }

    /// Validate the options against the driver they will be built with
    pub fn validate_as(&self, name: &str) -> Result<()> {
        match self.driver_or(name) {
            MODEL_DRIVER => {
                ConfigValidator::required(self.model.as_deref(), &format!("providers.{name}.model"))
            }
            TABLE_DRIVER => {
                ConfigValidator::required(self.table.as_deref(), &format!("providers.{name}.table"))?;
                ConfigValidator::non_empty_list(
                    &self.identifiers,
                    &format!("providers.{name}.identifiers"),
                )
            }
            // Custom drivers validate their own options when built
            _ => Ok(()),
        }
    }
}

/// Authentication section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Guards keyed by guard name
    pub guards: HashMap<String, GuardConfig>,

    /// User providers keyed by provider name
    pub providers: HashMap<String, UserProviderConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut guards = HashMap::new();
        guards.insert("web".to_string(), GuardConfig::default());

        let mut providers = HashMap::new();
        providers.insert("users".to_string(), UserProviderConfig::default());

        Self { guards, providers }
    }
}

impl AuthConfig {
    /// An auth section with no guards or providers
    pub fn empty() -> Self {
        Self {
            guards: HashMap::new(),
            providers: HashMap::new(),
        }
    }

    pub fn with_guard(mut self, name: impl Into<String>, guard: GuardConfig) -> Self {
        self.guards.insert(name.into(), guard);
        self
    }

    pub fn with_provider(mut self, name: impl Into<String>, provider: UserProviderConfig) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<()> {
        for (name, guard) in &self.guards {
            ConfigValidator::not_empty(&guard.driver, &format!("auth.guards.{name}.driver"))?;
            if !self.providers.contains_key(&guard.provider) {
                return Err(ConfigError::ValidationError(format!(
                    "guard '{}' uses unknown user provider '{}'",
                    name, guard.provider
                )));
            }
        }

        for (name, provider) in &self.providers {
            ConfigValidator::not_empty(&provider.driver, &format!("auth.providers.{name}.driver"))?;
            ConfigValidator::not_empty(&provider.table, &format!("auth.providers.{name}.table"))?;
        }

        Ok(())
    }
}

/// Guard options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardConfig {
    pub driver: String,
    pub provider: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            driver: SESSION_GUARD_DRIVER.to_string(),
            provider: "users".to_string(),
        }
    }
}

/// User provider options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserProviderConfig {
    pub driver: String,

    /// Users table inside each tenant's store
    pub table: String,

    /// Column matched against the active tenant id for row-partitioned users
    pub tenant_column: Option<String>,
}

impl Default for UserProviderConfig {
    fn default() -> Self {
        Self {
            driver: DATABASE_USER_PROVIDER_DRIVER.to_string(),
            table: "users".to_string(),
            tenant_column: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MultitenancyConfig {
        MultitenancyConfig::new("database")
            .with_provider("database", ProviderConfig::table("tenants", ["id", "slug"]))
            .with_provider("eloquent", ProviderConfig::model("tenant"))
    }

    #[test]
    fn test_defaults() {
        let config = MultitenancyConfig::default();
        assert_eq!(config.provider, MODEL_DRIVER);
        assert_eq!(config.connection_prefix, "tenant_");
        assert_eq!(config.auth.guards["web"].driver, SESSION_GUARD_DRIVER);
        assert_eq!(config.auth.providers["users"].driver, DATABASE_USER_PROVIDER_DRIVER);
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_default_provider_entry() {
        let config = MultitenancyConfig::new("database");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default provider 'database'"));
    }

    #[test]
    fn test_table_provider_requires_identifiers() {
        let config = MultitenancyConfig::new("database")
            .with_provider("database", ProviderConfig::table("tenants", Vec::<String>::new()));
        assert!(config.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_model_provider_requires_model() {
        let config = MultitenancyConfig::new("eloquent")
            .with_provider("eloquent", ProviderConfig::default());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("providers.eloquent.model"));
    }

    #[test]
    fn test_custom_driver_is_not_checked() {
        let provider = ProviderConfig {
            driver: Some("ldap".to_string()),
            ..ProviderConfig::default()
        };
        let config = MultitenancyConfig::new("directory").with_provider("directory", provider);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_guard_with_unknown_user_provider() {
        let auth = AuthConfig::empty().with_guard(
            "web",
            GuardConfig {
                driver: SESSION_GUARD_DRIVER.to_string(),
                provider: "admins".to_string(),
            },
        );
        let err = valid().with_auth(auth).validate().unwrap_err();
        assert!(err.to_string().contains("admins"));
    }

    #[test]
    fn test_provider_config_helpers() {
        let config = ProviderConfig::table("tenants", ["slug"]);
        assert_eq!(config.driver_or("whatever"), TABLE_DRIVER);
        assert_eq!(config.key_column(), "id");
        assert_eq!(config.with_key("uuid").key_column(), "uuid");

        let bare = ProviderConfig::default();
        assert_eq!(bare.driver_or("database"), "database");
    }

    #[test]
    fn test_deserialize_partial() {
        let json = serde_json::json!({
            "provider": "database",
            "providers": {
                "database": { "table": "tenants", "identifiers": ["id", "slug"] }
            }
        });
        let config: MultitenancyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.connection_prefix, "tenant_");
        assert_eq!(config.providers["database"].identifiers, vec!["id", "slug"]);
        assert!(config.validate().is_ok());
    }
}

//! Startup wiring
//!
//! Builds the process-wide [`Tenancy`]: the tenant manager with the `eloquent`
//! and `database` provider drivers, the default `<prefix><id>` connection
//! parser, and (with the `auth` feature) the `session.multi` and
//! `database.multi` auth drivers.

use multitenancy_config::{ConfigBuilder, MODEL_DRIVER, MultitenancyConfig, TABLE_DRIVER};
use multitenancy_core::{
    ModelProvider, ModelRegistry, ProviderConfig, QueryExecutor, Result, TableProvider,
    TenancyError, TenantManager, TenantProvider, database_per_tenant,
};
use multitenancy_log::info;
use std::sync::Arc;

#[cfg(feature = "auth")]
use multitenancy_auth::AuthRegistry;

type CustomFactory = Box<dyn Fn(&ProviderConfig) -> Result<Arc<dyn TenantProvider>> + Send + Sync>;

/// Configures and boots multitenancy for an application
///
/// ```rust,ignore
/// let tenancy = Bootstrap::new(config)
///     .landlord(landlord_connection)
///     .models(ModelRegistry::new().register(ModelDescriptor::new("tenant", "tenants")))
///     .boot()?;
///
/// // Per request
/// let manager = tenancy.request();
/// manager.resolve_tenant("acme").await?;
/// ```
pub struct Bootstrap {
    config: MultitenancyConfig,
    landlord: Option<Arc<dyn QueryExecutor>>,
    models: ModelRegistry,
    providers: Vec<(String, CustomFactory)>,
}

impl Bootstrap {
    pub fn new(config: MultitenancyConfig) -> Self {
        Self {
            config,
            landlord: None,
            models: ModelRegistry::new(),
            providers: Vec::new(),
        }
    }

    /// Build and validate the configuration first
    pub fn from_config(builder: ConfigBuilder) -> Result<Self> {
        Ok(Self::new(builder.build()?))
    }

    /// Connection holding the tenants table (or tenant models)
    pub fn landlord(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.landlord = Some(executor);
        self
    }

    /// Models the `eloquent` driver can resolve through
    pub fn models(mut self, models: ModelRegistry) -> Self {
        self.models = models;
        self
    }

    /// Register an extra provider driver, or replace a built-in one
    pub fn provider<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn TenantProvider>> + Send + Sync + 'static,
    {
        self.providers.push((name.into(), Box::new(factory)));
        self
    }

    /// Wire everything up and build every configured provider
    ///
    /// Configuration mistakes surface here rather than on the first request.
    pub fn boot(self) -> Result<Tenancy> {
        multitenancy_log::init();

        let prefix = self.config.connection_prefix.clone();
        let manager = TenantManager::new(self.config);

        let landlord = self.landlord;
        let models = Arc::new(self.models);

        {
            let landlord = landlord.clone();
            manager.extend(MODEL_DRIVER, move |config| {
                let provider = ModelProvider::from_config(config, &models, require(&landlord)?)?;
                Ok(Arc::new(provider) as Arc<dyn TenantProvider>)
            });
        }
        manager.extend(TABLE_DRIVER, move |config| {
            let provider = TableProvider::from_config(config, require(&landlord)?)?;
            Ok(Arc::new(provider) as Arc<dyn TenantProvider>)
        });

        for (name, factory) in self.providers {
            manager.extend(name, factory);
        }

        manager.set_connection_parser(database_per_tenant(prefix));
        manager.validate_providers()?;

        info!(
            "Multitenancy booted with default provider '{}'",
            manager.config().provider
        );

        Ok(Tenancy {
            #[cfg(feature = "auth")]
            auth: Arc::new(AuthRegistry::with_defaults(manager.config().auth.clone())),
            manager,
        })
    }
}

fn require(landlord: &Option<Arc<dyn QueryExecutor>>) -> Result<Arc<dyn QueryExecutor>> {
    landlord.clone().ok_or_else(|| {
        TenancyError::ProviderMisconfigured("no landlord connection configured".to_string())
    })
}

/// The booted, process-wide multitenancy services
#[derive(Clone)]
pub struct Tenancy {
    manager: TenantManager,
    #[cfg(feature = "auth")]
    auth: Arc<AuthRegistry>,
}

impl Tenancy {
    /// The root manager; its slot is not tied to any request
    pub fn manager(&self) -> &TenantManager {
        &self.manager
    }

    /// A manager with a fresh Active Tenant Slot for one request
    pub fn request(&self) -> TenantManager {
        self.manager.for_request()
    }

    #[cfg(feature = "auth")]
    pub fn auth(&self) -> &AuthRegistry {
        &self.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multitenancy_core::{ConnectionTemplate, MemoryDatabase, ModelDescriptor};
    use serde_json::json;

    fn landlord() -> Arc<MemoryDatabase> {
        Arc::new(MemoryDatabase::new().with_row("tenants", json!({"id": 3, "slug": "initech"})))
    }

    #[tokio::test]
    async fn test_boot_model_driver() {
        let config = MultitenancyConfig::default()
            .with_provider(MODEL_DRIVER, ProviderConfig::model("tenant"));
        let tenancy = Bootstrap::new(config)
            .landlord(landlord())
            .models(
                ModelRegistry::new()
                    .register(ModelDescriptor::new("tenant", "tenants").with_route_key("slug")),
            )
            .boot()
            .unwrap();

        let manager = tenancy.request();
        assert_eq!(manager.resolve_tenant("initech").await.unwrap().id, "3");

        let parsed = manager
            .parse_connection(ConnectionTemplate::new().with("driver", "sqlite"))
            .unwrap();
        assert_eq!(parsed.database(), Some("tenant_3"));
        assert!(!tenancy.manager().has_tenant());
    }

    #[test]
    fn test_boot_without_landlord_fails_fast() {
        let config = MultitenancyConfig::new(TABLE_DRIVER)
            .with_provider(TABLE_DRIVER, ProviderConfig::table("tenants", ["id"]));

        let err = Bootstrap::new(config).boot().err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_boot_rejects_unknown_model() {
        let config = MultitenancyConfig::default()
            .with_provider(MODEL_DRIVER, ProviderConfig::model("account"));

        let err = Bootstrap::new(config).landlord(landlord()).boot().err().unwrap();
        assert!(matches!(err, TenancyError::ProviderMisconfigured(_)));
    }

    #[test]
    fn test_custom_prefix() {
        let mut config = MultitenancyConfig::new(TABLE_DRIVER)
            .with_provider(TABLE_DRIVER, ProviderConfig::table("tenants", ["slug"]));
        config.connection_prefix = "org_".to_string();

        let tenancy = Bootstrap::new(config).landlord(landlord()).boot().unwrap();
        let manager = tenancy.request();
        tokio_test::block_on(manager.resolve_tenant("initech")).unwrap();

        let parsed = manager.parse_connection(ConnectionTemplate::new()).unwrap();
        assert_eq!(parsed.database(), Some("org_3"));
    }
}

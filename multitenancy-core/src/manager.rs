//! Tenant Manager
//!
//! The manager owns the provider registry, the connection parser and the
//! Active Tenant Slot of one request.
//!
//! Registry and parser are configured once at startup and shared by every
//! request. [`TenantManager::for_request`] hands each request its own slot,
//! so resolving a tenant in one request is never visible in another.
//!
//! # Usage
//!
//! ```rust,ignore
//! let manager = TenantManager::new(config);
//! manager
//!     .extend("database", move |config| {
//!         Ok(Arc::new(TableProvider::from_config(config, landlord.clone())?) as Arc<dyn TenantProvider>)
//!     })
//!     .set_connection_parser(database_per_tenant("tenant_"));
//!
//! // Per request
//! let request_manager = manager.for_request();
//! request_manager.resolve_tenant("acme").await?;
//! let config = request_manager.parse_connection(template)?;
//! ```

use crate::connection::{ConnectionFactory, ConnectionParser, ConnectionTemplate, TenantConnector};
use crate::error::{Result, TenancyError};
use crate::identify::{KeyExtractor, TenantRequest};
use crate::provider::{ProviderFactory, TenantProvider};
use crate::tenant::{Tenant, TenantContext};
use multitenancy_config::{MultitenancyConfig, ProviderConfig, Validate};
use multitenancy_log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// State shared by every request
struct Registry {
    config: MultitenancyConfig,
    providers: RwLock<Providers>,
    parser: RwLock<Option<ConnectionParser>>,
}

/// Factories keyed by driver name, built providers keyed by entry name
///
/// `generation` bumps on every registration; a provider built from an older
/// generation is never cached.
#[derive(Default)]
struct Providers {
    factories: HashMap<String, ProviderFactory>,
    built: HashMap<String, Arc<dyn TenantProvider>>,
    generation: u64,
}

/// Tenant Manager
///
/// Cloning is cheap; clones share both the registry and the Active Tenant
/// Slot. Use [`TenantManager::for_request`] for an independent slot.
#[derive(Clone)]
pub struct TenantManager {
    registry: Arc<Registry>,
    slot: Arc<RwLock<TenantContext>>,
    scope: Uuid,
}

impl TenantManager {
    /// Create a manager with no providers and no connection parser
    pub fn new(config: MultitenancyConfig) -> Self {
        Self {
            registry: Arc::new(Registry {
                config,
                providers: RwLock::new(Providers::default()),
                parser: RwLock::new(None),
            }),
            slot: Arc::new(RwLock::new(TenantContext::new())),
            scope: Uuid::new_v4(),
        }
    }

    pub fn config(&self) -> &MultitenancyConfig {
        &self.registry.config
    }

    /// Identifier of this manager's slot, for log correlation
    pub fn scope_id(&self) -> Uuid {
        self.scope
    }

    /// A manager sharing this registry with a fresh, empty slot
    pub fn for_request(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            slot: Arc::new(RwLock::new(TenantContext::new())),
            scope: Uuid::new_v4(),
        }
    }

    // ========================================================================
    // Providers
    // ========================================================================

    /// Register a provider factory under driver `name`, replacing any earlier one
    ///
    /// Every built provider whose entry uses that driver is dropped.
    pub fn extend<F>(&self, name: impl Into<String>, factory: F) -> &Self
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn TenantProvider>> + Send + Sync + 'static,
    {
        let name = name.into();
        let config = &self.registry.config;

        let mut providers = self.registry.providers.write();
        let replaced = providers
            .factories
            .insert(name.clone(), Arc::new(factory))
            .is_some();
        providers
            .built
            .retain(|entry, _| driver_for(config, entry) != name);
        providers.generation += 1;
        drop(providers);

        if replaced {
            debug!("Replaced tenant provider factory '{}'", name);
        } else {
            debug!("Registered tenant provider factory '{}'", name);
        }
        self
    }

    /// Whether a factory is registered under driver `name`
    pub fn has_provider(&self, name: &str) -> bool {
        self.registry.providers.read().factories.contains_key(name)
    }

    /// The named provider, or the configured default when `name` is `None`
    ///
    /// The entry's `driver` option selects the factory and defaults to the
    /// entry name. Providers are built on first use and reused afterwards.
    pub fn provider(&self, name: Option<&str>) -> Result<Arc<dyn TenantProvider>> {
        let name = name.unwrap_or(&self.registry.config.provider);
        let config = self
            .registry
            .config
            .provider_config(name)
            .cloned()
            .unwrap_or_default();
        let driver = config.driver_or(name);

        loop {
            let (factory, generation) = {
                let providers = self.registry.providers.read();
                if let Some(provider) = providers.built.get(name) {
                    return Ok(Arc::clone(provider));
                }
                let factory = providers
                    .factories
                    .get(driver)
                    .cloned()
                    .ok_or_else(|| TenancyError::UnknownProvider(driver.to_string()))?;
                (factory, providers.generation)
            };

            let provider = factory(&config)?;

            let mut providers = self.registry.providers.write();
            if providers.generation != generation {
                // Re-registered while building; retry with the new factory
                continue;
            }
            let provider = Arc::clone(
                providers
                    .built
                    .entry(name.to_string())
                    .or_insert(provider),
            );
            drop(providers);

            info!("Built tenant provider '{}' with driver '{}'", name, driver);
            return Ok(provider);
        }
    }

    /// Validate the configuration and build every configured provider
    ///
    /// Call at startup so misconfiguration fails before the first request.
    pub fn validate_providers(&self) -> Result<()> {
        self.registry.config.validate()?;

        let mut names: Vec<&String> = self.registry.config.providers.keys().collect();
        names.sort();
        for name in names {
            self.provider(Some(name))?;
        }
        Ok(())
    }

    // ========================================================================
    // Active tenant
    // ========================================================================

    /// Resolve `key` with the default provider and make the tenant active
    ///
    /// On failure the slot is left empty, even if a tenant was active before.
    pub async fn resolve_tenant(&self, key: &str) -> Result<Arc<Tenant>> {
        self.resolve_tenant_using(None, key).await
    }

    /// [`TenantManager::resolve_tenant`] with an explicitly named provider
    pub async fn resolve_tenant_using(&self, provider: Option<&str>, key: &str) -> Result<Arc<Tenant>> {
        let resolved = match self.provider(provider) {
            Ok(provider) => provider.resolve(key).await,
            Err(e) => Err(e),
        };

        match resolved {
            Ok(tenant) => {
                let tenant = Arc::new(tenant);
                let previous = self.slot.write().set_tenant(Arc::clone(&tenant));
                if let Some(previous) = previous.filter(|p| p.id != tenant.id) {
                    debug!(tenant: tenant.id, "Replaced active tenant {}", previous.id);
                }
                info!(tenant: tenant.id, "Resolved tenant from key '{}' [{}]", key, self.scope);
                Ok(tenant)
            }
            Err(e) => {
                if let Some(previous) = self.slot.write().clear() {
                    warn!(tenant: previous.id, "Cleared active tenant after failed resolve: {}", e);
                } else {
                    debug!("Tenant resolve for key '{}' failed: {}", key, e);
                }
                Err(e)
            }
        }
    }

    /// Extract a key from `request` and resolve it
    pub async fn resolve_from(
        &self,
        extractor: &dyn KeyExtractor,
        request: &dyn TenantRequest,
    ) -> Result<Arc<Tenant>> {
        match extractor.extract(request) {
            Some(key) => self.resolve_tenant(&key).await,
            None => {
                self.clear();
                Err(TenancyError::TenantNotFound(
                    "request does not name a tenant".to_string(),
                ))
            }
        }
    }

    /// Whether a tenant is active
    pub fn has_tenant(&self) -> bool {
        self.slot.read().has_tenant()
    }

    /// The active tenant
    pub fn tenant(&self) -> Result<Arc<Tenant>> {
        self.slot
            .read()
            .tenant()
            .cloned()
            .ok_or(TenancyError::NoActiveTenant)
    }

    /// Id of the active tenant
    pub fn tenant_id(&self) -> Option<String> {
        self.slot.read().tenant_id().map(str::to_string)
    }

    /// Forget the active tenant; a no-op when none is active
    pub fn clear(&self) {
        if let Some(previous) = self.slot.write().clear() {
            debug!(tenant: previous.id, "Cleared active tenant");
        }
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Install the connection parser, replacing any earlier one
    pub fn set_connection_parser<F>(&self, parser: F) -> &Self
    where
        F: Fn(ConnectionTemplate, &Tenant) -> ConnectionTemplate + Send + Sync + 'static,
    {
        *self.registry.parser.write() = Some(Arc::new(parser));
        self
    }

    /// Rewrite `template` for the active tenant
    ///
    /// Without an installed parser the template comes back unchanged.
    pub fn parse_connection(&self, template: ConnectionTemplate) -> Result<ConnectionTemplate> {
        let tenant = self.tenant()?;
        let parser = self.registry.parser.read().clone();

        match parser {
            Some(parser) => {
                let parsed = parser(template, &tenant);
                debug!(
                    tenant: tenant.id,
                    "Parsed connection for database {}",
                    parsed.database().unwrap_or("-")
                );
                Ok(parsed)
            }
            None => Ok(template),
        }
    }

    /// The `multitenancy` connection driver bound to this manager's slot
    pub fn connector(&self, factory: Arc<dyn ConnectionFactory>) -> TenantConnector {
        TenantConnector::new(self.clone(), factory)
    }

    #[cfg(test)]
    pub(crate) fn activate_for_test(&self, tenant: Tenant) {
        self.slot.write().set_tenant(Arc::new(tenant));
    }
}

impl std::fmt::Debug for TenantManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantManager")
            .field("scope", &self.scope)
            .field("provider", &self.registry.config.provider)
            .field("tenant", &self.tenant_id())
            .finish()
    }
}

fn driver_for<'a>(config: &'a MultitenancyConfig, entry: &'a str) -> &'a str {
    config
        .provider_config(entry)
        .map_or(entry, |options| options.driver_or(entry))
}

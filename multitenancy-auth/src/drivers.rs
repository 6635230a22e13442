//! Auth driver registry
//!
//! Guards and user providers are built by driver name from the `auth` section
//! of the configuration. The tenant-aware drivers `session.multi` and
//! `database.multi` are registered by [`AuthRegistry::with_defaults`]; hosts
//! may register more.
//!
//! The registry is configured once at startup. Guards are built per request
//! from an [`AuthContext`] carrying that request's tenant manager and session.

use crate::cookie::CookieJar;
use crate::events::{EventDispatcher, NullDispatcher};
use crate::guard::{SessionGuard, StatefulGuard};
use crate::password::{PasswordHasher, PasswordVerifier};
use crate::session::SessionStore;
use crate::user_provider::{DatabaseUserProvider, UserProvider};
use crate::{AuthError, Result};
use multitenancy_config::{
    AuthConfig, DATABASE_USER_PROVIDER_DRIVER, GuardConfig, SESSION_GUARD_DRIVER,
    UserProviderConfig,
};
use multitenancy_core::{ConnectionFactory, ConnectionTemplate, TenantManager};
use multitenancy_log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators of one request's guards and user providers
#[derive(Clone)]
pub struct AuthContext {
    pub manager: TenantManager,
    pub factory: Arc<dyn ConnectionFactory>,
    /// Template of the tenant connection, before rewriting
    pub connection: ConnectionTemplate,
    pub hasher: Arc<dyn PasswordVerifier>,
    pub session: Arc<dyn SessionStore>,
    pub events: Arc<dyn EventDispatcher>,
    pub cookies: Option<Arc<dyn CookieJar>>,
}

impl AuthContext {
    /// A context with the default hasher, no events and no cookie jar
    pub fn new(
        manager: TenantManager,
        factory: Arc<dyn ConnectionFactory>,
        connection: ConnectionTemplate,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            manager,
            factory,
            connection,
            hasher: Arc::new(PasswordHasher::default()),
            session,
            events: Arc::new(NullDispatcher),
            cookies: None,
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordVerifier>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    pub fn with_cookie_jar(mut self, cookies: Arc<dyn CookieJar>) -> Self {
        self.cookies = Some(cookies);
        self
    }
}

/// Builds a guard named `name` around its user provider
pub type GuardFactory = Arc<
    dyn Fn(&str, &GuardConfig, Arc<dyn UserProvider>, &AuthContext) -> Result<Arc<dyn StatefulGuard>>
        + Send
        + Sync,
>;

/// Builds a user provider
pub type UserProviderFactory =
    Arc<dyn Fn(&UserProviderConfig, &AuthContext) -> Result<Arc<dyn UserProvider>> + Send + Sync>;

/// Guard and user provider drivers
pub struct AuthRegistry {
    config: AuthConfig,
    guards: HashMap<String, GuardFactory>,
    providers: HashMap<String, UserProviderFactory>,
}

impl AuthRegistry {
    /// A registry with no drivers
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            guards: HashMap::new(),
            providers: HashMap::new(),
        }
    }

    /// A registry with the `session.multi` and `database.multi` drivers
    pub fn with_defaults(config: AuthConfig) -> Self {
        let mut registry = Self::new(config);
        registry
            .extend(SESSION_GUARD_DRIVER, |name, _config, provider, context| {
                let mut guard = SessionGuard::new(
                    name,
                    provider,
                    context.session.clone(),
                    context.manager.clone(),
                    context.events.clone(),
                );
                if let Some(cookies) = &context.cookies {
                    guard = guard.with_cookie_jar(cookies.clone());
                }
                Ok(Arc::new(guard) as Arc<dyn StatefulGuard>)
            })
            .provider(DATABASE_USER_PROVIDER_DRIVER, |config, context| {
                let provider = DatabaseUserProvider::new(
                    context.manager.clone(),
                    context.factory.clone(),
                    context.connection.clone(),
                    context.hasher.clone(),
                    config.table.clone(),
                )
                .with_tenant_column(config.tenant_column.clone());
                Ok(Arc::new(provider) as Arc<dyn UserProvider>)
            });
        registry
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a guard driver
    pub fn extend<F>(&mut self, driver: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &GuardConfig, Arc<dyn UserProvider>, &AuthContext) -> Result<Arc<dyn StatefulGuard>>
            + Send
            + Sync
            + 'static,
    {
        let driver = driver.into();
        debug!("Registered guard driver '{}'", driver);
        self.guards.insert(driver, Arc::new(factory));
        self
    }

    /// Register a user provider driver
    pub fn provider<F>(&mut self, driver: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&UserProviderConfig, &AuthContext) -> Result<Arc<dyn UserProvider>>
            + Send
            + Sync
            + 'static,
    {
        let driver = driver.into();
        debug!("Registered user provider driver '{}'", driver);
        self.providers.insert(driver, Arc::new(factory));
        self
    }

    /// Build the named user provider
    pub fn create_user_provider(
        &self,
        name: &str,
        context: &AuthContext,
    ) -> Result<Arc<dyn UserProvider>> {
        let config = self.config.providers.get(name).ok_or_else(|| {
            AuthError::Misconfigured(format!("user provider '{}' is not configured", name))
        })?;
        let factory = self
            .providers
            .get(&config.driver)
            .ok_or_else(|| AuthError::UnknownDriver(config.driver.clone()))?;

        factory(config, context)
    }

    /// Build the named guard
    pub fn guard(&self, name: &str, context: &AuthContext) -> Result<Arc<dyn StatefulGuard>> {
        let config = self.config.guards.get(name).ok_or_else(|| {
            AuthError::Misconfigured(format!("guard '{}' is not configured", name))
        })?;
        let factory = self
            .guards
            .get(&config.driver)
            .ok_or_else(|| AuthError::UnknownDriver(config.driver.clone()))?;

        let provider = self.create_user_provider(&config.provider, context)?;
        factory(name, config, provider, context)
    }
}

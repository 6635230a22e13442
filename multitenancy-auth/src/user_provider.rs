//! Tenant-aware user provider
//!
//! Users live in each tenant's own store. Every lookup opens the connection
//! produced by [`TenantManager::parse_connection`] for the active tenant, so a
//! user can only ever be found inside the tenant that is currently resolved.

use crate::password::PasswordVerifier;
use crate::user::{AuthUser, Credentials, GenericUser};
use crate::{AuthError, Result};
use async_trait::async_trait;
use multitenancy_core::{
    ConnectionFactory, ConnectionTemplate, Filter, QueryExecutor, QuerySource, TenantManager,
};
use multitenancy_log::debug;
use std::sync::Arc;

/// Looks users up and checks their credentials
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Fetch a user by identifier
    async fn retrieve_by_id(&self, id: &str) -> Result<GenericUser>;

    /// Fetch a user by the non-password credential fields
    async fn retrieve_by_credentials(&self, credentials: &Credentials) -> Result<GenericUser>;

    /// Check the presented password against the user's stored hash
    fn validate_credentials(&self, user: &GenericUser, credentials: &Credentials) -> Result<()>;
}

/// User provider over a users table in the active tenant's database
pub struct DatabaseUserProvider {
    manager: TenantManager,
    factory: Arc<dyn ConnectionFactory>,
    connection: ConnectionTemplate,
    connection_name: String,
    hasher: Arc<dyn PasswordVerifier>,
    table: String,
    tenant_column: Option<String>,
}

impl DatabaseUserProvider {
    /// Create a provider reading `table` through `connection`
    ///
    /// `connection` is the untouched template; it is rewritten for the active
    /// tenant on every lookup.
    pub fn new(
        manager: TenantManager,
        factory: Arc<dyn ConnectionFactory>,
        connection: ConnectionTemplate,
        hasher: Arc<dyn PasswordVerifier>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            factory,
            connection,
            connection_name: "tenant".to_string(),
            hasher,
            table: table.into(),
            tenant_column: None,
        }
    }

    /// Name the connection is opened under
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = name.into();
        self
    }

    /// Also require `column = <tenant id>` on every lookup
    pub fn with_tenant_column(mut self, column: Option<String>) -> Self {
        self.tenant_column = column;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn connection(&self) -> Result<Arc<dyn QueryExecutor>> {
        let config = self.manager.parse_connection(self.connection.clone())?;
        Ok(self.factory.make(&config, &self.connection_name).await?)
    }

    fn scoped(&self, mut filter: Filter) -> Result<Filter> {
        if let Some(column) = &self.tenant_column {
            filter = filter.and(column.as_str(), self.manager.tenant()?.id.as_str());
        }
        Ok(filter)
    }

    async fn first(&self, filter: Filter) -> Result<GenericUser> {
        let filter = self.scoped(filter)?;
        let connection = self.connection().await?;

        connection
            .first(&QuerySource::Table(self.table.clone()), &filter)
            .await?
            .map(GenericUser::new)
            .ok_or(AuthError::UserNotFound)
    }
}

#[async_trait]
impl UserProvider for DatabaseUserProvider {
    async fn retrieve_by_id(&self, id: &str) -> Result<GenericUser> {
        self.first(Filter::eq("id", id)).await
    }

    async fn retrieve_by_credentials(&self, credentials: &Credentials) -> Result<GenericUser> {
        let filter = credentials
            .lookup_fields()
            .fold(Filter::new(), |filter, (key, value)| {
                filter.and(key.as_str(), value.clone())
            });

        // Never match "any user" on a password-only login
        if filter.is_empty() {
            return Err(AuthError::UserNotFound);
        }

        debug!(
            "Looking up user in {} by {:?}",
            self.table,
            filter.conditions().iter().map(|(c, _)| c).collect::<Vec<_>>()
        );
        self.first(filter).await
    }

    fn validate_credentials(&self, user: &GenericUser, credentials: &Credentials) -> Result<()> {
        let (Some(plain), Some(hash)) = (credentials.password(), user.auth_password()) else {
            return Err(AuthError::InvalidCredentials);
        };

        if self.hasher.verify(plain, hash)? {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordHasher;
    use multitenancy_config::MultitenancyConfig;
    use multitenancy_core::{MemoryConnectionFactory, MemoryDatabase, Tenant, TenancyError};
    use serde_json::json;

    struct Fixture {
        manager: TenantManager,
        provider: DatabaseUserProvider,
    }

    fn fixture(tenant_column: Option<&str>) -> Fixture {
        let hasher = PasswordHasher::default();
        let hash = hasher.hash("secret").unwrap();

        let acme = MemoryDatabase::new()
            .with_row("users", json!({"id": 1, "email": "a@acme.test", "password": hash, "tenant_id": "42"}))
            .with_row("users", json!({"id": 2, "email": "b@acme.test", "password": hash, "tenant_id": "7"}));
        let factory = MemoryConnectionFactory::new().with_database("tenant_42", Arc::new(acme));

        let manager = TenantManager::new(MultitenancyConfig::default());
        manager.set_connection_parser(multitenancy_core::database_per_tenant("tenant_"));

        let provider = DatabaseUserProvider::new(
            manager.clone(),
            Arc::new(factory),
            ConnectionTemplate::new().with("driver", "mysql"),
            Arc::new(hasher),
            "users",
        )
        .with_tenant_column(tenant_column.map(str::to_string));

        Fixture { manager, provider }
    }

    async fn activate(manager: &TenantManager, id: &str) {
        let id = id.to_string();
        manager.extend("static", move |_| {
            Ok(Arc::new(StaticProvider(id.clone())) as Arc<dyn multitenancy_core::TenantProvider>)
        });
        manager.resolve_tenant_using(Some("static"), "any").await.unwrap();
    }

    struct StaticProvider(String);

    #[async_trait]
    impl multitenancy_core::TenantProvider for StaticProvider {
        async fn resolve(&self, _key: &str) -> multitenancy_core::Result<Tenant> {
            Ok(Tenant::new(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_requires_active_tenant() {
        let f = fixture(None);
        let err = f.provider.retrieve_by_id("1").await.unwrap_err();
        assert!(matches!(err, AuthError::Tenancy(TenancyError::NoActiveTenant)));
    }

    #[tokio::test]
    async fn test_retrieve_and_validate() {
        let f = fixture(None);
        activate(&f.manager, "42").await;

        let credentials = Credentials::new()
            .with("email", "a@acme.test")
            .with("password", "secret");
        let user = f.provider.retrieve_by_credentials(&credentials).await.unwrap();
        assert_eq!(user.auth_identifier(), Some("1".to_string()));
        assert!(f.provider.validate_credentials(&user, &credentials).is_ok());

        let wrong = credentials.clone().with("password", "nope");
        assert!(matches!(
            f.provider.validate_credentials(&user, &wrong),
            Err(AuthError::InvalidCredentials)
        ));

        let unknown = Credentials::new().with("email", "z@acme.test");
        assert!(matches!(
            f.provider.retrieve_by_credentials(&unknown).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_password_only_credentials_match_nobody() {
        let f = fixture(None);
        activate(&f.manager, "42").await;

        let credentials = Credentials::new().with("password", "secret");
        assert!(matches!(
            f.provider.retrieve_by_credentials(&credentials).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_tenant_without_database_fails_with_storage_error() {
        let f = fixture(None);
        activate(&f.manager, "7").await;

        let err = f.provider.retrieve_by_id("1").await.unwrap_err();
        assert!(matches!(err, AuthError::Tenancy(TenancyError::Storage(_))));
    }

    #[tokio::test]
    async fn test_tenant_column_scopes_rows() {
        let f = fixture(Some("tenant_id"));
        activate(&f.manager, "42").await;

        assert!(f.provider.retrieve_by_id("1").await.is_ok());
        // Row 2 lives in the same database but belongs to tenant 7
        assert!(matches!(
            f.provider.retrieve_by_id("2").await,
            Err(AuthError::UserNotFound)
        ));
    }
}

//! Tenant Providers
//!
//! A provider turns a lookup key (an id, a slug, a hostname) into a [`Tenant`].
//! Two drivers ship with the crate:
//!
//! - [`ModelProvider`] (`eloquent`): looks the key up through an ORM model,
//!   by primary key and then by route key.
//! - [`TableProvider`] (`database`): looks the key up in a raw table, trying
//!   the configured identifier columns in order.

use crate::error::{Result, TenancyError};
use crate::store::{Filter, ModelDescriptor, ModelRegistry, QueryExecutor, QuerySource};
use crate::tenant::Tenant;
use async_trait::async_trait;
use multitenancy_config::ProviderConfig;
use multitenancy_log::debug;
use std::sync::Arc;

/// Resolves lookup keys to tenants
#[async_trait]
pub trait TenantProvider: Send + Sync {
    /// Resolve a key, failing with `TenantNotFound` when nothing matches
    async fn resolve(&self, key: &str) -> Result<Tenant>;
}

/// Builds a provider from its configuration entry
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn TenantProvider>> + Send + Sync>;

/// Provider backed by an ORM model
pub struct ModelProvider {
    model: ModelDescriptor,
    executor: Arc<dyn QueryExecutor>,
}

impl ModelProvider {
    /// Bind the named model from `registry`
    pub fn new(
        model: &str,
        registry: &ModelRegistry,
        executor: Arc<dyn QueryExecutor>,
    ) -> Result<Self> {
        Ok(Self {
            model: registry.descriptor(model)?.clone(),
            executor,
        })
    }

    /// Build from a provider entry; `model` is required
    pub fn from_config(
        config: &ProviderConfig,
        registry: &ModelRegistry,
        executor: Arc<dyn QueryExecutor>,
    ) -> Result<Self> {
        let model = config.model.as_deref().ok_or_else(|| {
            TenancyError::ProviderMisconfigured("model provider needs a model name".to_string())
        })?;
        Self::new(model, registry, executor)
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }
}

#[async_trait]
impl TenantProvider for ModelProvider {
    async fn resolve(&self, key: &str) -> Result<Tenant> {
        if key.is_empty() {
            return Err(TenancyError::TenantNotFound(key.to_string()));
        }

        let source = QuerySource::Model(self.model.clone());
        for column in self.model.lookup_columns() {
            debug!("Looking up {} by {} = {}", self.model.name, column, key);
            if let Some(record) = self.executor.first(&source, &Filter::eq(column, key)).await? {
                return Tenant::from_record(record, &self.model.primary_key);
            }
        }

        Err(TenancyError::TenantNotFound(key.to_string()))
    }
}

/// Provider backed by a raw table
pub struct TableProvider {
    executor: Arc<dyn QueryExecutor>,
    table: String,
    identifiers: Vec<String>,
    key_column: String,
}

impl TableProvider {
    /// Look tenants up in `table` by each of `identifiers`, in order
    ///
    /// # Examples
    ///
    /// ```
    /// use multitenancy_core::{MemoryDatabase, TableProvider};
    /// use std::sync::Arc;
    ///
    /// let provider = TableProvider::new(Arc::new(MemoryDatabase::new()), "tenants", ["id", "slug"]);
    /// assert!(provider.is_ok());
    ///
    /// let empty = TableProvider::new(Arc::new(MemoryDatabase::new()), "tenants", Vec::<String>::new());
    /// assert!(empty.is_err());
    /// ```
    pub fn new<I, S>(
        executor: Arc<dyn QueryExecutor>,
        table: impl Into<String>,
        identifiers: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        let identifiers: Vec<String> = identifiers.into_iter().map(Into::into).collect();

        if table.trim().is_empty() {
            return Err(TenancyError::ProviderMisconfigured(
                "table provider needs a table".to_string(),
            ));
        }
        if identifiers.is_empty() {
            return Err(TenancyError::ProviderMisconfigured(format!(
                "table provider for '{}' needs at least one identifier column",
                table
            )));
        }

        Ok(Self {
            executor,
            table,
            identifiers,
            key_column: "id".to_string(),
        })
    }

    /// Build from a provider entry; `table` and `identifiers` are required
    pub fn from_config(config: &ProviderConfig, executor: Arc<dyn QueryExecutor>) -> Result<Self> {
        let table = config.table.clone().unwrap_or_default();
        Ok(Self::new(executor, table, config.identifiers.iter().cloned())?
            .with_key_column(config.key_column()))
    }

    /// Column holding the tenant id (default `id`)
    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = column.into();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }
}

#[async_trait]
impl TenantProvider for TableProvider {
    async fn resolve(&self, key: &str) -> Result<Tenant> {
        if key.is_empty() {
            return Err(TenancyError::TenantNotFound(key.to_string()));
        }

        let source = QuerySource::Table(self.table.clone());
        for column in &self.identifiers {
            debug!("Looking up {} by {} = {}", self.table, column, key);
            if let Some(record) = self.executor.first(&source, &Filter::eq(column, key)).await? {
                return Tenant::from_record(record, &self.key_column);
            }
        }

        Err(TenancyError::TenantNotFound(key.to_string()))
    }
}

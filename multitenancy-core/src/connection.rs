//! Tenant Connections
//!
//! Connection templates, the parsers that specialise them per tenant, and the
//! `multitenancy` connection driver the host's connection factory calls into.
//!
//! # Usage
//!
//! ```rust,ignore
//! manager.set_connection_parser(database_per_tenant("tenant_"));
//!
//! // Inside a request, after the tenant is resolved
//! let connector = manager.connector(factory.clone());
//! let conn = connector.connect("tenant", template).await?;
//! ```

use crate::error::Result;
use crate::manager::TenantManager;
use crate::store::{QueryExecutor, Record, value_as_key};
use crate::tenant::Tenant;
use async_trait::async_trait;
use multitenancy_log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Name of the connection driver that routes through [`TenantConnector`]
pub const CONNECTION_DRIVER: &str = "multitenancy";

/// Generic connection parameters (driver, host, credentials, database, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionTemplate(Record);

impl ConnectionTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Set a parameter, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// The `database` parameter
    pub fn database(&self) -> Option<&str> {
        self.get_str("database")
    }

    pub fn driver(&self) -> Option<&str> {
        self.get_str("driver")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Record {
        &self.0
    }

    pub fn into_map(self) -> Record {
        self.0
    }
}

impl From<Record> for ConnectionTemplate {
    fn from(map: Record) -> Self {
        Self(map)
    }
}

/// Rewrites a connection template for one tenant
///
/// Parsers must be pure and deterministic, and must keep every field they do
/// not rewrite.
pub type ConnectionParser =
    Arc<dyn Fn(ConnectionTemplate, &Tenant) -> ConnectionTemplate + Send + Sync>;

/// Point `database` at `<prefix><tenant id>`
///
/// # Examples
///
/// ```
/// use multitenancy_core::{ConnectionTemplate, Tenant, database_per_tenant};
///
/// let parser = database_per_tenant("tenant_");
/// let config = parser(ConnectionTemplate::new().with("driver", "mysql"), &Tenant::new("42"));
///
/// assert_eq!(config.database(), Some("tenant_42"));
/// assert_eq!(config.driver(), Some("mysql"));
/// ```
pub fn database_per_tenant(
    prefix: impl Into<String>,
) -> impl Fn(ConnectionTemplate, &Tenant) -> ConnectionTemplate + Send + Sync + 'static {
    let prefix = prefix.into();
    move |mut template: ConnectionTemplate, tenant: &Tenant| {
        template.set("database", format!("{}{}", prefix, tenant.id));
        template
    }
}

/// Point `database` at a name rendered from `pattern`
///
/// `{id}` is the tenant id and `{<attribute>}` any string or numeric tenant
/// attribute. Unknown placeholders are left as written.
pub fn database_pattern(
    pattern: impl Into<String>,
) -> impl Fn(ConnectionTemplate, &Tenant) -> ConnectionTemplate + Send + Sync + 'static {
    let pattern = pattern.into();
    move |mut template: ConnectionTemplate, tenant: &Tenant| {
        template.set("database", render_pattern(&pattern, tenant));
        template
    }
}

/// Keep the database and select schema `<prefix><tenant id>`
///
/// Sets both `schema` and `search_path` so either driver convention applies.
pub fn schema_per_tenant(
    prefix: impl Into<String>,
) -> impl Fn(ConnectionTemplate, &Tenant) -> ConnectionTemplate + Send + Sync + 'static {
    let prefix = prefix.into();
    move |mut template: ConnectionTemplate, tenant: &Tenant| {
        let schema = format!("{}{}", prefix, tenant.id);
        template.set("search_path", schema.clone());
        template.set("schema", schema);
        template
    }
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap());

/// Render a `tenant_{id}`-style pattern for a tenant
pub fn render_pattern(pattern: &str, tenant: &Tenant) -> String {
    PLACEHOLDER
        .replace_all(pattern, |caps: &Captures<'_>| {
            let name = &caps[1];
            if name == "id" {
                return tenant.id.clone();
            }
            tenant
                .attribute(name)
                .and_then(value_as_key)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// The host's connection factory
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open a connection from a (possibly rewritten) config
    async fn make(&self, config: &ConnectionTemplate, name: &str)
    -> Result<Arc<dyn QueryExecutor>>;
}

/// The `multitenancy` connection driver
///
/// Rewrites a connection config through the request's manager when a tenant
/// is active, then opens it with the host factory. Without an active tenant
/// the config is opened untouched, which keeps public routes and background
/// jobs working against the shared connection.
#[derive(Clone)]
pub struct TenantConnector {
    manager: TenantManager,
    factory: Arc<dyn ConnectionFactory>,
}

impl TenantConnector {
    pub fn new(manager: TenantManager, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self { manager, factory }
    }

    /// The config that will actually be opened
    pub fn prepare(&self, config: ConnectionTemplate) -> Result<ConnectionTemplate> {
        if self.manager.has_tenant() {
            self.manager.parse_connection(config)
        } else {
            debug!("No active tenant, opening connection config unchanged");
            Ok(config)
        }
    }

    /// Prepare and open a named connection
    pub async fn connect(
        &self,
        name: &str,
        config: ConnectionTemplate,
    ) -> Result<Arc<dyn QueryExecutor>> {
        let config = self.prepare(config)?;
        self.factory.make(&config, name).await
    }
}

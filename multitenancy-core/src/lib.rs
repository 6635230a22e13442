//! Multi-Tenancy Core
//!
//! Tenant resolution and tenant-scoped connection rewriting.
//!
//! # Features
//!
//! - 🏢 **Tenant Manager** - Provider registry plus a per-request active tenant
//! - 🔍 **Tenant Providers** - Model-backed and table-backed lookups, or your own
//! - 🗄️ **Connection Rewriting** - Database per tenant, schema per tenant, patterns
//! - 🌐 **Identification** - Header, subdomain and path key extractors
//!
//! # Quick Start
//!
//! ## 1. Register Providers
//!
//! ```rust,ignore
//! use multitenancy_core::*;
//!
//! let manager = TenantManager::new(config);
//! let landlord: Arc<dyn QueryExecutor> = Arc::new(my_landlord_connection);
//!
//! manager.extend(TABLE_DRIVER, move |config| {
//!     Ok(Arc::new(TableProvider::from_config(config, landlord.clone())?) as Arc<dyn TenantProvider>)
//! });
//! manager.set_connection_parser(database_per_tenant("tenant_"));
//!
//! // Fail fast on bad configuration
//! manager.validate_providers()?;
//! ```
//!
//! ## 2. Resolve Per Request
//!
//! ```rust,ignore
//! let manager = root.for_request();
//! let tenant = manager
//!     .resolve_from(&SubdomainKeyExtractor::new("example.com"), &request)
//!     .await?;
//! ```
//!
//! ## 3. Open Tenant Connections
//!
//! ```rust,ignore
//! let config = manager.parse_connection(ConnectionTemplate::new().with("driver", "mysql"))?;
//! assert_eq!(config.database(), Some("tenant_42"));
//!
//! // Or let the connector decide whether to rewrite
//! let conn = manager.connector(factory).connect("tenant", template).await?;
//! ```

pub mod connection;
pub mod error;
pub mod identify;
pub mod manager;
pub mod memory;
pub mod provider;
pub mod store;
pub mod tenant;

pub use connection::{
    CONNECTION_DRIVER, ConnectionFactory, ConnectionParser, ConnectionTemplate, TenantConnector,
    database_pattern, database_per_tenant, render_pattern, schema_per_tenant,
};
pub use error::{Result, TenancyError};
pub use identify::{
    HeaderKeyExtractor, KeyExtractor, PathKeyExtractor, RequestParts, SubdomainKeyExtractor,
    TenantRequest,
};
pub use manager::TenantManager;
pub use memory::{MemoryConnectionFactory, MemoryDatabase};
pub use provider::{ModelProvider, ProviderFactory, TableProvider, TenantProvider};
pub use store::{Filter, ModelDescriptor, ModelRegistry, QueryExecutor, QuerySource, Record};
pub use tenant::{Tenant, TenantContext};

pub use multitenancy_config::{MODEL_DRIVER, MultitenancyConfig, ProviderConfig, TABLE_DRIVER};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::connection::{
        ConnectionFactory, ConnectionTemplate, TenantConnector, database_per_tenant,
    };
    pub use crate::error::{Result, TenancyError};
    pub use crate::identify::{KeyExtractor, TenantRequest};
    pub use crate::manager::TenantManager;
    pub use crate::provider::{ModelProvider, TableProvider, TenantProvider};
    pub use crate::store::{Filter, QueryExecutor, QuerySource, Record};
    pub use crate::tenant::Tenant;
}

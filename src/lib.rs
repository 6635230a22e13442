// Multitenancy - tenant resolution, per-tenant connections and tenant-aware auth
//
// This crate re-exports the member crates and wires them together at startup.

pub mod bootstrap;

pub use bootstrap::{Bootstrap, Tenancy};

// Re-export core functionality
pub use multitenancy_core::*;

pub use multitenancy_config;
pub use multitenancy_core;
pub use multitenancy_log;

#[cfg(feature = "auth")]
pub use multitenancy_auth;

pub use multitenancy_config::{ConfigBuilder, ConfigError};

/// Prelude for common imports.
///
/// ```
/// use multitenancy::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bootstrap::{Bootstrap, Tenancy};
    pub use multitenancy_config::{ConfigBuilder, MultitenancyConfig, ProviderConfig};
    pub use multitenancy_core::prelude::*;

    #[cfg(feature = "auth")]
    pub use multitenancy_auth::{
        AuthContext, AuthRegistry, Credentials, Guard, StatefulGuard, UserProvider,
    };
}

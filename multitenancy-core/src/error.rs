//! Tenancy errors

use multitenancy_config::ConfigError;

/// Errors raised while resolving tenants and building tenant connections
#[derive(Debug, thiserror::Error)]
pub enum TenancyError {
    /// The lookup key matched no tenant
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// A provider could not be built from its configuration
    #[error("Tenant provider misconfigured: {0}")]
    ProviderMisconfigured(String),

    /// No provider factory was registered under the requested name
    #[error("Unknown tenant provider: {0}")]
    UnknownProvider(String),

    /// The operation needs an active tenant and none is resolved
    #[error("No active tenant")]
    NoActiveTenant,

    /// The record store or connection factory failed
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TenancyError {
    /// The key matched no tenant
    pub fn is_not_found(&self) -> bool {
        matches!(self, TenancyError::TenantNotFound(_))
    }

    /// Programmer or deployment mistakes that should stop startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TenancyError::ProviderMisconfigured(_)
                | TenancyError::UnknownProvider(_)
                | TenancyError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TenancyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(TenancyError::TenantNotFound("acme".into()).is_not_found());
        assert!(!TenancyError::TenantNotFound("acme".into()).is_fatal());
        assert!(TenancyError::UnknownProvider("ldap".into()).is_fatal());
        assert!(TenancyError::ProviderMisconfigured("no table".into()).is_fatal());
        assert!(!TenancyError::NoActiveTenant.is_fatal());
    }

    #[test]
    fn test_config_errors_are_fatal() {
        let err: TenancyError = ConfigError::ValidationError("table cannot be empty".into()).into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("table cannot be empty"));
    }
}

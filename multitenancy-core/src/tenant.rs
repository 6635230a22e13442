//! Tenant Context
//!
//! The tenant value produced by providers and the per-request slot that holds
//! the active one.

use crate::error::{Result, TenancyError};
use crate::store::{Record, value_as_key};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A resolved tenant
///
/// Tenants are shared as `Arc<Tenant>` once resolved and never change
/// afterwards; the id is used verbatim by connection parsers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    /// Unique tenant identifier
    pub id: String,

    /// Remaining columns of the backing record (slug, name, ...)
    #[serde(default)]
    pub attributes: Record,
}

impl Tenant {
    /// Create a tenant with no attributes
    ///
    /// # Examples
    ///
    /// ```
    /// use multitenancy_core::Tenant;
    ///
    /// let tenant = Tenant::new("42").with_attribute("slug", "acme");
    /// assert_eq!(tenant.attribute_str("slug"), Some("acme"));
    /// ```
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Record::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build a tenant from a store record, taking the id from `key_column`
    ///
    /// String and numeric ids are accepted; any other shape means the
    /// provider is pointed at the wrong column.
    pub fn from_record(record: Record, key_column: &str) -> Result<Self> {
        let id = record
            .get(key_column)
            .and_then(value_as_key)
            .ok_or_else(|| {
                TenancyError::ProviderMisconfigured(format!(
                    "tenant record has no usable '{}' column",
                    key_column
                ))
            })?;

        Ok(Self {
            id,
            attributes: record,
        })
    }

    /// Get a raw attribute
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Get a string attribute
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// The Active Tenant Slot of one request
///
/// Holds at most one tenant. Only [`crate::TenantManager`] writes to it.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    tenant: Option<Arc<Tenant>>,
}

impl TenantContext {
    /// Create empty tenant context
    pub fn new() -> Self {
        Self { tenant: None }
    }

    /// Get tenant
    pub fn tenant(&self) -> Option<&Arc<Tenant>> {
        self.tenant.as_ref()
    }

    /// Replace the active tenant, returning the previous one
    pub(crate) fn set_tenant(&mut self, tenant: Arc<Tenant>) -> Option<Arc<Tenant>> {
        self.tenant.replace(tenant)
    }

    /// Empty the slot, returning the tenant that was active
    pub(crate) fn clear(&mut self) -> Option<Arc<Tenant>> {
        self.tenant.take()
    }

    /// Get tenant ID
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant.as_ref().map(|t| t.id.as_str())
    }

    /// Check if tenant is set
    pub fn has_tenant(&self) -> bool {
        self.tenant.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tenant_builder() {
        let tenant = Tenant::new("42")
            .with_attribute("slug", "acme")
            .with_attribute("seats", 10);

        assert_eq!(tenant.id, "42");
        assert_eq!(tenant.attribute_str("slug"), Some("acme"));
        assert_eq!(tenant.attribute("seats"), Some(&json!(10)));
        assert_eq!(tenant.attribute_str("seats"), None);
    }

    #[test]
    fn test_from_record_numeric_key() {
        let record = json!({"id": 42, "slug": "acme"}).as_object().cloned().unwrap();
        let tenant = Tenant::from_record(record, "id").unwrap();

        assert_eq!(tenant.id, "42");
        assert_eq!(tenant.attribute_str("slug"), Some("acme"));
    }

    #[test]
    fn test_from_record_missing_key() {
        let record = json!({"slug": "acme"}).as_object().cloned().unwrap();
        let err = Tenant::from_record(record, "id").unwrap_err();

        assert!(matches!(err, TenancyError::ProviderMisconfigured(_)));
    }

    #[test]
    fn test_tenant_context() {
        let mut context = TenantContext::new();
        assert!(!context.has_tenant());
        assert_eq!(context.tenant_id(), None);

        let previous = context.set_tenant(Arc::new(Tenant::new("1")));
        assert!(previous.is_none());
        assert_eq!(context.tenant_id(), Some("1"));

        let previous = context.set_tenant(Arc::new(Tenant::new("2")));
        assert_eq!(previous.unwrap().id, "1");
        assert_eq!(context.tenant_id(), Some("2"));

        assert_eq!(context.clear().unwrap().id, "2");
        assert!(!context.has_tenant());
    }
}

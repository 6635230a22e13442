//! Record store contract
//!
//! The ORM / query engine lives in the host application. Providers and the
//! user provider only need point lookups: the first record of a table or
//! model that matches a conjunction of column equalities.

use crate::error::{Result, TenancyError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One row, keyed by column name
pub type Record = serde_json::Map<String, Value>;

/// Render a string or numeric value as a lookup key
pub fn value_as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Where a lookup runs
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    /// A raw table on a relational connection
    Table(String),
    /// An ORM model
    Model(ModelDescriptor),
}

impl QuerySource {
    /// The table the lookup ends up reading
    pub fn table(&self) -> &str {
        match self {
            QuerySource::Table(table) => table,
            QuerySource::Model(model) => &model.table,
        }
    }
}

/// Conjunction of `column = value` conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Empty filter, matching every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on a single column
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(column, value)
    }

    /// Add a condition
    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate the filter against a record
    ///
    /// Keys arrive as strings, so `"42"` matches a numeric `42` column.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            record.get(column).is_some_and(|actual| {
                actual == expected
                    || matches!(
                        (value_as_key(actual), value_as_key(expected)),
                        (Some(a), Some(b)) if a == b
                    )
            })
        })
    }
}

/// Point-lookup query execution against one connection
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// First record of `source` matching `filter`, if any
    async fn first(&self, source: &QuerySource, filter: &Filter) -> Result<Option<Record>>;
}

/// Describes an ORM model that tenants are stored as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Name the configuration refers to
    pub name: String,

    /// Backing table
    pub table: String,

    /// Primary key column, also used as the tenant id
    pub primary_key: String,

    /// Secondary identifier column (for example a slug)
    pub route_key: Option<String>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            route_key: None,
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn with_route_key(mut self, column: impl Into<String>) -> Self {
        self.route_key = Some(column.into());
        self
    }

    /// Columns a key is looked up by, primary key first
    pub fn lookup_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_key.as_str()).chain(self.route_key.as_deref())
    }

    fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() || self.primary_key.trim().is_empty() {
            return Err(TenancyError::ProviderMisconfigured(format!(
                "model '{}' needs a table and a primary key",
                self.name
            )));
        }
        Ok(())
    }
}

/// Known model descriptors, by name
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor; a later registration under the same name wins
    pub fn register(mut self, model: ModelDescriptor) -> Self {
        self.models.insert(model.name.clone(), model);
        self
    }

    /// Look a descriptor up, rejecting unknown or incomplete ones
    pub fn descriptor(&self, name: &str) -> Result<&ModelDescriptor> {
        let model = self.models.get(name).ok_or_else(|| {
            TenancyError::ProviderMisconfigured(format!("unknown tenant model '{}'", name))
        })?;
        model.validate()?;
        Ok(model)
    }
}

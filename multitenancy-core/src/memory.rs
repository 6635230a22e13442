//! In-memory store
//!
//! A [`QueryExecutor`] and [`ConnectionFactory`] backed by process memory,
//! used by tests and local development.

use crate::connection::{ConnectionFactory, ConnectionTemplate};
use crate::error::{Result, TenancyError};
use crate::store::{Filter, QueryExecutor, QuerySource, Record};
use async_trait::async_trait;
use multitenancy_log::trace;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Tables of JSON rows
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; anything other than a JSON object is ignored
    pub fn insert(&self, table: &str, row: Value) {
        if let Value::Object(record) = row {
            self.tables
                .write()
                .entry(table.to_string())
                .or_default()
                .push(record);
        }
    }

    /// Builder form of [`MemoryDatabase::insert`]
    pub fn with_row(self, table: &str, row: Value) -> Self {
        self.insert(table, row);
        self
    }

    /// Number of rows in a table
    pub fn count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }
}

#[async_trait]
impl QueryExecutor for MemoryDatabase {
    async fn first(&self, source: &QuerySource, filter: &Filter) -> Result<Option<Record>> {
        let tables = self.tables.read();
        let row = tables
            .get(source.table())
            .and_then(|rows| rows.iter().find(|row| filter.matches(row)))
            .cloned();
        Ok(row)
    }
}

/// Opens [`MemoryDatabase`]s by the `database` parameter of a config
#[derive(Default)]
pub struct MemoryConnectionFactory {
    databases: HashMap<String, Arc<MemoryDatabase>>,
    opened: RwLock<Vec<ConnectionTemplate>>,
}

impl MemoryConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a database under its name
    pub fn with_database(mut self, name: impl Into<String>, database: Arc<MemoryDatabase>) -> Self {
        self.databases.insert(name.into(), database);
        self
    }

    /// Every config opened so far, oldest first
    pub fn opened(&self) -> Vec<ConnectionTemplate> {
        self.opened.read().clone()
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn make(&self, config: &ConnectionTemplate, name: &str) -> Result<Arc<dyn QueryExecutor>> {
        self.opened.write().push(config.clone());

        let database = config.database().ok_or_else(|| {
            TenancyError::Storage(format!("connection '{}' has no database", name))
        })?;
        trace!("Opening in-memory database {} for connection {}", database, name);

        self.databases
            .get(database)
            .cloned()
            .map(|db| db as Arc<dyn QueryExecutor>)
            .ok_or_else(|| TenancyError::Storage(format!("unknown database '{}'", database)))
    }
}

//! Session store contract
//!
//! The guard keeps the logged-in user in the current request's session. Any
//! backend (cookie, Redis, database) plugs in through [`SessionStore`].

use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Key/value session of the current request
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current session id
    fn id(&self) -> String;

    /// Get a value
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Set a value
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a value, returning it
    async fn remove(&self, key: &str) -> Result<Option<Value>>;

    /// Issue a new session id; `destroy` also drops the stored data
    async fn regenerate(&self, destroy: bool) -> Result<()>;
}

#[derive(Debug)]
struct SessionState {
    id: String,
    data: HashMap<String, Value>,
}

/// In-process session, for tests and single-node development
#[derive(Debug)]
pub struct MemorySession {
    state: RwLock<SessionState>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState {
                id: Uuid::new_v4().to_string(),
                data: HashMap::new(),
            }),
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.state.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().data.is_empty()
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySession {
    fn id(&self) -> String {
        self.state.read().id.clone()
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.state.read().data.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.state.write().data.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.state.write().data.remove(key))
    }

    async fn regenerate(&self, destroy: bool) -> Result<()> {
        let mut state = self.state.write();
        state.id = Uuid::new_v4().to_string();
        if destroy {
            state.data.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_remove() {
        let session = MemorySession::new();
        assert!(session.is_empty());

        session.put("login_web", json!({"id": "5"})).await.unwrap();
        assert_eq!(session.get("login_web").await.unwrap(), Some(json!({"id": "5"})));
        assert_eq!(session.len(), 1);

        assert!(session.remove("login_web").await.unwrap().is_some());
        assert!(session.get("login_web").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_regenerate() {
        let session = MemorySession::new();
        session.put("k", json!(1)).await.unwrap();
        let first = session.id();

        session.regenerate(false).await.unwrap();
        assert_ne!(session.id(), first);
        assert_eq!(session.get("k").await.unwrap(), Some(json!(1)));

        session.regenerate(true).await.unwrap();
        assert!(session.is_empty());
    }
}

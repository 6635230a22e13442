//! Auth events
//!
//! Fire-and-forget notifications of guard state changes. Dispatch never
//! fails and never blocks authentication.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A guard state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    /// Credentials are about to be checked
    Attempting { guard: String, tenant: Option<String> },
    /// A user was loaded for the request
    Authenticated {
        guard: String,
        tenant: Option<String>,
        user_id: String,
    },
    /// A user logged in
    Login {
        guard: String,
        tenant: Option<String>,
        user_id: String,
    },
    /// Credentials were rejected
    Failed {
        guard: String,
        tenant: Option<String>,
        user_id: Option<String>,
    },
    /// A user logged out
    Logout {
        guard: String,
        tenant: Option<String>,
        user_id: Option<String>,
    },
}

impl AuthEvent {
    pub fn guard(&self) -> &str {
        match self {
            AuthEvent::Attempting { guard, .. }
            | AuthEvent::Authenticated { guard, .. }
            | AuthEvent::Login { guard, .. }
            | AuthEvent::Failed { guard, .. }
            | AuthEvent::Logout { guard, .. } => guard,
        }
    }

    pub fn tenant(&self) -> Option<&str> {
        match self {
            AuthEvent::Attempting { tenant, .. }
            | AuthEvent::Authenticated { tenant, .. }
            | AuthEvent::Login { tenant, .. }
            | AuthEvent::Failed { tenant, .. }
            | AuthEvent::Logout { tenant, .. } => tenant.as_deref(),
        }
    }
}

/// Receives auth events
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: AuthEvent);
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl EventDispatcher for NullDispatcher {
    fn dispatch(&self, _event: AuthEvent) {}
}

/// Fans events out to every subscriber over a broadcast channel
///
/// Slow subscribers lag and lose the oldest events.
#[derive(Debug, Clone)]
pub struct BroadcastDispatcher {
    sender: broadcast::Sender<AuthEvent>,
}

impl BroadcastDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventDispatcher for BroadcastDispatcher {
    fn dispatch(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }
}

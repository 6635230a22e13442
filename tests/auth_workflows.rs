//! End-to-end login flows across tenants.

#![cfg(feature = "auth")]

use multitenancy::multitenancy_auth::{
    AuthContext, AuthError, AuthEvent, BroadcastDispatcher, Credentials, MemorySession,
    PasswordHasher,
};
use multitenancy::prelude::*;
use multitenancy::{MemoryConnectionFactory, MemoryDatabase, TABLE_DRIVER};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

struct App {
    tenancy: Tenancy,
    factory: Arc<MemoryConnectionFactory>,
}

fn app() -> App {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
provider = "database"

[providers.database]
table = "tenants"
identifiers = ["slug"]

[auth.providers.users]
driver = "database.multi"
table = "users"
"#
    )
    .unwrap();

    let landlord = Arc::new(
        MemoryDatabase::new()
            .with_row("tenants", json!({"id": 1, "slug": "acme"}))
            .with_row("tenants", json!({"id": 2, "slug": "globex"})),
    );

    let hash = PasswordHasher::default().hash("correct horse").unwrap();
    let acme = MemoryDatabase::new()
        .with_row("users", json!({"id": 1, "email": "sam@acme.test", "password": hash}));
    let globex = MemoryDatabase::new()
        .with_row("users", json!({"id": 1, "email": "sam@globex.test", "password": hash}));

    let factory = Arc::new(
        MemoryConnectionFactory::new()
            .with_database("tenant_1", Arc::new(acme))
            .with_database("tenant_2", Arc::new(globex)),
    );

    let tenancy = Bootstrap::from_config(ConfigBuilder::new().add_file(file.path()))
        .unwrap()
        .landlord(landlord)
        .boot()
        .unwrap();
    assert_eq!(tenancy.manager().config().provider, TABLE_DRIVER);

    App { tenancy, factory }
}

impl App {
    async fn request(&self, tenant: &str, session: Arc<MemorySession>) -> Arc<dyn StatefulGuard> {
        let manager = self.tenancy.request();
        manager.resolve_tenant(tenant).await.unwrap();

        let context = AuthContext::new(
            manager,
            self.factory.clone(),
            ConnectionTemplate::new().with("driver", "mysql"),
            session,
        );
        self.tenancy.auth().guard("web", &context).unwrap()
    }
}

#[tokio::test]
async fn test_login_is_scoped_to_tenant() {
    let app = app();
    let session = Arc::new(MemorySession::new());

    let guard = app.request("acme", session.clone()).await;
    let acme_login = Credentials::new()
        .with("email", "sam@acme.test")
        .with("password", "correct horse");
    guard.attempt(&acme_login).await.unwrap();

    // Next request on the same tenant picks the login up from the session
    let guard = app.request("acme", session.clone()).await;
    assert_eq!(guard.id().await.unwrap(), Some("1".to_string()));

    // The same session presented to another tenant is a guest there
    let guard = app.request("globex", session.clone()).await;
    assert!(guard.guest().await.unwrap());
    assert!(matches!(
        guard.attempt(&acme_login).await,
        Err(AuthError::UserNotFound)
    ));
}

#[tokio::test]
async fn test_wrong_password_fires_failed_event() {
    let app = app();
    let events = BroadcastDispatcher::default();
    let mut rx = events.subscribe();

    let manager = app.tenancy.request();
    manager.resolve_tenant("globex").await.unwrap();
    let context = AuthContext::new(
        manager,
        app.factory.clone(),
        ConnectionTemplate::new(),
        Arc::new(MemorySession::new()),
    )
    .with_events(Arc::new(events));
    let guard = app.tenancy.auth().guard("web", &context).unwrap();

    let credentials = Credentials::new()
        .with("email", "sam@globex.test")
        .with("password", "battery staple");
    assert!(matches!(
        guard.attempt(&credentials).await,
        Err(AuthError::InvalidCredentials)
    ));

    assert!(matches!(rx.recv().await.unwrap(), AuthEvent::Attempting { .. }));
    match rx.recv().await.unwrap() {
        AuthEvent::Failed { tenant, user_id, .. } => {
            assert_eq!(tenant.as_deref(), Some("2"));
            assert_eq!(user_id.as_deref(), Some("1"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = app();
    let session = Arc::new(MemorySession::new());

    let guard = app.request("globex", session.clone()).await;
    guard.login_using_id("1").await.unwrap();
    assert!(!session.is_empty());

    guard.logout().await.unwrap();
    assert!(session.is_empty());
    assert!(guard.guest().await.unwrap());

    let guard = app.request("globex", session.clone()).await;
    assert!(guard.guest().await.unwrap());
}

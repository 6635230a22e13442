// Tenant-aware session guard

use crate::cookie::CookieJar;
use crate::events::{AuthEvent, EventDispatcher};
use crate::session::SessionStore;
use crate::user::{AuthUser, Credentials, GenericUser};
use crate::user_provider::UserProvider;
use crate::{AuthError, Result};
use async_trait::async_trait;
use multitenancy_config::SESSION_GUARD_DRIVER;
use multitenancy_core::TenantManager;
use multitenancy_log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Answers who the current user is
#[async_trait]
pub trait Guard: Send + Sync {
    /// The current user, if any
    async fn user(&self) -> Result<Option<GenericUser>>;

    /// Whether the current user is authenticated
    async fn check(&self) -> Result<bool> {
        Ok(self.user().await?.is_some())
    }

    /// Whether the current user is a guest
    async fn guest(&self) -> Result<bool> {
        Ok(!self.check().await?)
    }

    /// Identifier of the current user
    async fn id(&self) -> Result<Option<String>> {
        Ok(self.user().await?.and_then(|user| user.auth_identifier()))
    }

    /// Check credentials without logging in
    async fn validate(&self, credentials: &Credentials) -> Result<bool>;
}

/// A guard that keeps the login across requests
#[async_trait]
pub trait StatefulGuard: Guard {
    /// Check credentials and log the user in
    async fn attempt(&self, credentials: &Credentials) -> Result<GenericUser>;

    /// Check credentials and authenticate for this request only
    async fn once(&self, credentials: &Credentials) -> Result<GenericUser>;

    /// Log a user in
    async fn login(&self, user: GenericUser) -> Result<()>;

    /// Log in the user with the given identifier
    async fn login_using_id(&self, id: &str) -> Result<GenericUser>;

    /// Log the current user out
    async fn logout(&self) -> Result<()>;
}

/// What the session remembers about a login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct SessionLogin {
    id: String,
    tenant: String,
}

#[derive(Default)]
struct GuardState {
    /// Current user and the tenant it was loaded under
    user: Option<(String, GenericUser)>,
    logged_out: bool,
}

/// Session guard whose logins are bound to the active tenant
///
/// The session entry records the tenant the user logged in under; under any
/// other tenant it is ignored, and users are always loaded through the
/// tenant-scoped [`UserProvider`].
pub struct SessionGuard {
    name: String,
    provider: Arc<dyn UserProvider>,
    session: Arc<dyn SessionStore>,
    manager: TenantManager,
    events: Arc<dyn EventDispatcher>,
    cookies: Option<Arc<dyn CookieJar>>,
    state: Mutex<GuardState>,
}

impl SessionGuard {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn UserProvider>,
        session: Arc<dyn SessionStore>,
        manager: TenantManager,
        events: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            session,
            manager,
            events,
            cookies: None,
            state: Mutex::new(GuardState::default()),
        }
    }

    /// Expire the remember-me cookie on logout
    pub fn with_cookie_jar(mut self, cookies: Arc<dyn CookieJar>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session key holding this guard's login
    pub fn session_key(&self) -> String {
        format!("login_{}_{}", self.name, driver_digest())
    }

    /// Cookie holding this guard's remember-me token
    pub fn recaller_name(&self) -> String {
        format!("remember_{}_{}", self.name, driver_digest())
    }

    fn tenant_id(&self) -> Option<String> {
        self.manager.tenant_id()
    }

    fn set_user(&self, tenant: String, user: GenericUser) {
        let mut state = self.state.lock();
        state.user = Some((tenant, user));
        state.logged_out = false;
    }

    fn fail(&self, user: Option<&GenericUser>) {
        warn!(
            "Failed login attempt on guard {} for tenant {}",
            self.name,
            self.tenant_id().as_deref().unwrap_or("-")
        );
        self.events.dispatch(AuthEvent::Failed {
            guard: self.name.clone(),
            tenant: self.tenant_id(),
            user_id: user.and_then(AuthUser::auth_identifier),
        });
    }

    /// Look up and verify credentials, firing `Attempting` and `Failed`
    async fn check_credentials(&self, credentials: &Credentials) -> Result<GenericUser> {
        self.events.dispatch(AuthEvent::Attempting {
            guard: self.name.clone(),
            tenant: self.tenant_id(),
        });

        let user = match self.provider.retrieve_by_credentials(credentials).await {
            Ok(user) => user,
            Err(e) => {
                if e.is_auth_failure() {
                    self.fail(None);
                }
                return Err(e);
            }
        };

        if let Err(e) = self.provider.validate_credentials(&user, credentials) {
            if e.is_auth_failure() {
                self.fail(Some(&user));
            }
            return Err(e);
        }

        Ok(user)
    }

    async fn user_from_session(&self, tenant: &str) -> Result<Option<GenericUser>> {
        let Some(value) = self.session.get(&self.session_key()).await? else {
            return Ok(None);
        };

        let login: SessionLogin = match serde_json::from_value(value) {
            Ok(login) => login,
            Err(e) => {
                warn!("Ignoring malformed login in session for guard {}: {}", self.name, e);
                return Ok(None);
            }
        };

        if login.tenant != tenant {
            warn!(
                tenant: tenant,
                "Ignoring session login of guard {} made under tenant {}", self.name, login.tenant
            );
            return Ok(None);
        }

        match self.provider.retrieve_by_id(&login.id).await {
            Ok(user) => Ok(Some(user)),
            Err(AuthError::UserNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Digest identifying the guard driver in session and cookie names
fn driver_digest() -> String {
    hex::encode(Sha256::digest(SESSION_GUARD_DRIVER.as_bytes()))
}

#[async_trait]
impl Guard for SessionGuard {
    async fn user(&self) -> Result<Option<GenericUser>> {
        let logged_out = self.state.lock().logged_out;
        if logged_out {
            return Ok(None);
        }

        let tenant = self.manager.tenant()?;

        {
            let state = self.state.lock();
            if let Some((owner, user)) = &state.user {
                if *owner == tenant.id {
                    return Ok(Some(user.clone()));
                }
            }
        }

        let Some(user) = self.user_from_session(&tenant.id).await? else {
            return Ok(None);
        };

        if let Some(user_id) = user.auth_identifier() {
            self.events.dispatch(AuthEvent::Authenticated {
                guard: self.name.clone(),
                tenant: Some(tenant.id.clone()),
                user_id,
            });
        }
        self.set_user(tenant.id.clone(), user.clone());

        Ok(Some(user))
    }

    async fn validate(&self, credentials: &Credentials) -> Result<bool> {
        match self.check_credentials(credentials).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_auth_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl StatefulGuard for SessionGuard {
    async fn attempt(&self, credentials: &Credentials) -> Result<GenericUser> {
        let user = self.check_credentials(credentials).await?;
        self.login(user.clone()).await?;
        Ok(user)
    }

    async fn once(&self, credentials: &Credentials) -> Result<GenericUser> {
        let user = self.check_credentials(credentials).await?;
        let tenant = self.manager.tenant()?;
        self.set_user(tenant.id.clone(), user.clone());
        Ok(user)
    }

    async fn login(&self, user: GenericUser) -> Result<()> {
        let tenant = self.manager.tenant()?;
        let id = user
            .auth_identifier()
            .ok_or_else(|| AuthError::Misconfigured("user record has no identifier".to_string()))?;

        let login = SessionLogin {
            id: id.clone(),
            tenant: tenant.id.clone(),
        };
        let value = serde_json::to_value(&login).map_err(|e| AuthError::Session(e.to_string()))?;
        self.session.put(&self.session_key(), value).await?;
        // New session id against fixation
        self.session.regenerate(false).await?;

        info!(tenant: tenant.id, "User {} logged in on guard {}", id, self.name);
        self.events.dispatch(AuthEvent::Login {
            guard: self.name.clone(),
            tenant: Some(tenant.id.clone()),
            user_id: id.clone(),
        });
        self.events.dispatch(AuthEvent::Authenticated {
            guard: self.name.clone(),
            tenant: Some(tenant.id.clone()),
            user_id: id,
        });
        self.set_user(tenant.id.clone(), user);

        Ok(())
    }

    async fn login_using_id(&self, id: &str) -> Result<GenericUser> {
        let user = self.provider.retrieve_by_id(id).await?;
        self.login(user.clone()).await?;
        Ok(user)
    }

    async fn logout(&self) -> Result<()> {
        let user = {
            let mut state = self.state.lock();
            state.logged_out = true;
            state.user.take().map(|(_, user)| user)
        };

        self.session.remove(&self.session_key()).await?;
        if let Some(cookies) = &self.cookies {
            cookies.forget(&self.recaller_name());
        }

        let user_id = user.as_ref().and_then(AuthUser::auth_identifier);
        debug!("Logged out {:?} from guard {}", user_id, self.name);
        self.events.dispatch(AuthEvent::Logout {
            guard: self.name.clone(),
            tenant: self.tenant_id(),
            user_id,
        });

        Ok(())
    }
}

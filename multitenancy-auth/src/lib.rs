// Tenant-aware authentication: session guard and database user provider

pub mod cookie;
pub mod drivers;
pub mod error;
pub mod events;
pub mod guard;
pub mod password;
pub mod session;
pub mod user;
pub mod user_provider;

pub use cookie::{CookieJar, MemoryCookieJar, QueuedCookie};
pub use drivers::{AuthContext, AuthRegistry, GuardFactory, UserProviderFactory};
pub use error::{AuthError, Result};
pub use events::{AuthEvent, BroadcastDispatcher, EventDispatcher, NullDispatcher};
pub use guard::{Guard, SessionGuard, StatefulGuard};
pub use password::{HashAlgorithm, PasswordHasher, PasswordVerifier};
pub use session::{MemorySession, SessionStore};
pub use user::{AuthUser, Credentials, GenericUser};
pub use user_provider::{DatabaseUserProvider, UserProvider};

pub use multitenancy_config::{DATABASE_USER_PROVIDER_DRIVER, SESSION_GUARD_DRIVER};

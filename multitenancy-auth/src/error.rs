// Error types for authentication

use multitenancy_core::TenancyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("Password verification error: {0}")]
    PasswordVerifyError(String),

    #[error("Unknown auth driver: {0}")]
    UnknownDriver(String),

    #[error("Auth misconfigured: {0}")]
    Misconfigured(String),
}

impl AuthError {
    /// Failures the end user caused by presenting bad credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials | AuthError::UserNotFound)
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

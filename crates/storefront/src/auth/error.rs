//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::identity::IdentityError;
use crate::storage::StorageError;

/// Errors that can occur during authentication and access checks.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] indian_flavour_core::EmailError),

    /// Password shorter than the identity service accepts.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// Email/password pair was rejected.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The operation needs a signed-in user.
    #[error("please sign in first")]
    NotSignedIn,

    /// The operation is only for signed-out visitors.
    #[error("already signed in")]
    AlreadySignedIn,

    /// Signed in, but without the required role.
    #[error("you do not have access to this page")]
    Forbidden,

    /// Identity service error.
    #[error("identity service error: {0}")]
    Identity(IdentityError),

    /// Profile lookup failed.
    #[error("profile lookup failed: {0}")]
    Backend(#[from] BackendError),

    /// Session could not be read or written locally.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            other => Self::Identity(other),
        }
    }
}

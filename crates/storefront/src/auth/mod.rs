//! Auth store and access gating.
//!
//! Holds the signed-in user and their identity-service session. The session
//! is persisted under [`AUTH_STORAGE_KEY`] so the CLI stays signed in
//! between runs; [`AuthStore::load_user`] restores it.
//!
//! # Areas
//!
//! | Area        | Who may enter                    |
//! |-------------|----------------------------------|
//! | `Public`    | everyone                         |
//! | `GuestOnly` | signed-out visitors (login/register) |
//! | `Customer`  | any signed-in user (cart, orders, profile) |
//! | `Admin`     | signed-in users with the admin role |

mod error;

pub use error::AuthError;

use chrono::{DateTime, Utc};
use indian_flavour_core::{Email, Profile, ProfileId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::backend::{BackendClient, BackendError};
use crate::identity::{AuthSession, AuthUser, IdentityClient, SignUp};
use crate::models::CurrentUser;
use crate::storage::{LocalStorage, StorageError, read_json, write_json};

/// Local storage key for the session.
pub const AUTH_STORAGE_KEY: &str = "auth-session";

/// Minimum password length accepted by the identity service.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Access class of a command or page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Public,
    GuestOnly,
    Customer,
    Admin,
}

/// Outcome of [`AuthStore::sign_up`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The account is active and the store is now signed in.
    SignedIn(CurrentUser),
    /// A confirmation email was sent; sign in after confirming.
    ConfirmationRequired,
}

/// Session as written to local storage.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    user: AuthUser,
}

impl From<&AuthSession> for StoredSession {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.expose_secret().to_owned(),
            refresh_token: session.refresh_token.expose_secret().to_owned(),
            expires_at: session.expires_at,
            user: session.user.clone(),
        }
    }
}

impl From<StoredSession> for AuthSession {
    fn from(stored: StoredSession) -> Self {
        Self {
            access_token: SecretString::from(stored.access_token),
            refresh_token: SecretString::from(stored.refresh_token),
            expires_at: stored.expires_at,
            user: stored.user,
        }
    }
}

/// The signed-in user, kept in sync with local storage.
pub struct AuthStore<S> {
    storage: S,
    identity: IdentityClient,
    backend: BackendClient,
    session: Option<AuthSession>,
    user: Option<CurrentUser>,
}

impl<S> std::fmt::Debug for AuthStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl<S: LocalStorage> AuthStore<S> {
    /// A signed-out store. Call [`load_user`](Self::load_user) to restore a
    /// saved session.
    #[must_use]
    pub const fn new(storage: S, identity: IdentityClient, backend: BackendClient) -> Self {
        Self {
            storage,
            identity,
            backend,
            session: None,
            user: None,
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    /// A backend client acting as the signed-in user (anonymous otherwise).
    #[must_use]
    pub fn client(&self) -> BackendClient {
        match &self.session {
            Some(session) => self.backend.with_access_token(session.access_token.clone()),
            None => self.backend.clone(),
        }
    }

    /// Check that the current user may enter `area`.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn`, `AlreadySignedIn` or `Forbidden`.
    pub fn authorize(&self, area: Area) -> Result<(), AuthError> {
        match (area, &self.user) {
            (Area::Public, _) | (Area::GuestOnly, None) | (Area::Customer, Some(_)) => Ok(()),
            (Area::GuestOnly, Some(_)) => Err(AuthError::AlreadySignedIn),
            (Area::Customer | Area::Admin, None) => Err(AuthError::NotSignedIn),
            (Area::Admin, Some(user)) if user.is_admin() => Ok(()),
            (Area::Admin, Some(_)) => Err(AuthError::Forbidden),
        }
    }

    /// The signed-in user, or `NotSignedIn`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` if nobody is signed in.
    pub fn require_user(&self) -> Result<&CurrentUser, AuthError> {
        self.user.as_ref().ok_or(AuthError::NotSignedIn)
    }

    /// The signed-in admin, or `NotSignedIn`/`Forbidden`.
    ///
    /// # Errors
    ///
    /// Returns an error unless an admin is signed in.
    pub fn require_admin(&self) -> Result<&CurrentUser, AuthError> {
        self.authorize(Area::Admin)?;
        self.require_user()
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Restore the saved session, refreshing it if expired, and load the
    /// user's profile.
    ///
    /// Any failure other than local storage I/O leaves the store signed out
    /// and removes the stale session.
    ///
    /// # Errors
    ///
    /// Returns an error only if local storage cannot be read or cleared.
    #[instrument(skip(self))]
    pub async fn load_user(&mut self) -> Result<Option<&CurrentUser>, AuthError> {
        self.session = None;
        self.user = None;

        let stored = match read_json::<StoredSession, _>(&self.storage, AUTH_STORAGE_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(None),
            Err(StorageError::Malformed { .. }) => {
                warn!("Discarding malformed saved session");
                self.storage.remove(AUTH_STORAGE_KEY)?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match self.restore(stored.into()).await {
            Ok(()) => Ok(self.user.as_ref()),
            Err(e) => {
                warn!(error = %e, "Saved session is no longer valid, signing out");
                self.session = None;
                self.user = None;
                self.storage.remove(AUTH_STORAGE_KEY)?;
                Ok(None)
            }
        }
    }

    async fn restore(&mut self, mut session: AuthSession) -> Result<(), AuthError> {
        if session.is_expired(Utc::now()) {
            debug!("Saved session expired, refreshing");
            session = self.identity.refresh(&session.refresh_token).await?;
        }
        let account = self.identity.get_user(&session.access_token).await?;
        session.user = account;
        self.establish(session).await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySignedIn`, `InvalidEmail`, `InvalidCredentials`, or an
    /// error if the profile cannot be loaded or the session saved.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&CurrentUser, AuthError> {
        self.authorize(Area::GuestOnly)?;
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self
            .identity
            .sign_in_with_password(email.as_str(), password)
            .await?;
        self.establish(session).await?;
        info!(user_id = ?self.user.as_ref().map(|u| u.id), "Signed in");
        self.require_user()
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySignedIn`, `InvalidEmail`, `WeakPassword`, or an
    /// identity service error (e.g. the email is already registered).
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Registration, AuthError> {
        self.authorize(Area::GuestOnly)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        match self
            .identity
            .sign_up(email.as_str(), password, full_name.trim())
            .await?
        {
            SignUp::Session(session) => {
                self.establish(session).await?;
                let user = self.require_user()?.clone();
                info!(user_id = %user.id, "Registered");
                Ok(Registration::SignedIn(user))
            }
            SignUp::ConfirmationRequired(account) => {
                info!(user_id = %account.id, "Registered, awaiting email confirmation");
                Ok(Registration::ConfirmationRequired)
            }
        }
    }

    /// Sign out. The remote sign-out is best effort; the local session is
    /// always cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved session cannot be removed.
    #[instrument(skip(self))]
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        if let Some(session) = self.session.take()
            && let Err(e) = self.identity.sign_out(&session.access_token).await
        {
            warn!(error = %e, "Remote sign-out failed, clearing local session anyway");
        }
        self.user = None;
        self.storage.remove(AUTH_STORAGE_KEY)?;
        info!("Signed out");
        Ok(())
    }

    /// Re-read the profile row, e.g. after the name was changed.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` or the backend error.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&mut self) -> Result<&CurrentUser, AuthError> {
        let session = self.session.as_ref().ok_or(AuthError::NotSignedIn)?;
        let profile = fetch_profile(&self.client(), session.user.id).await?;
        self.user = Some(CurrentUser::from_parts(&session.user, profile.as_ref()));
        self.require_user()
    }

    /// Adopt `session`: load the profile, then persist.
    async fn establish(&mut self, session: AuthSession) -> Result<(), AuthError> {
        let client = self.backend.with_access_token(session.access_token.clone());
        let profile = fetch_profile(&client, session.user.id).await?;
        let user = CurrentUser::from_parts(&session.user, profile.as_ref());

        write_json(&self.storage, AUTH_STORAGE_KEY, &StoredSession::from(&session))?;
        self.session = Some(session);
        self.user = Some(user);
        Ok(())
    }
}

async fn fetch_profile(
    client: &BackendClient,
    id: ProfileId,
) -> Result<Option<Profile>, BackendError> {
    client
        .from("profiles")
        .select("*")
        .eq("id", id)
        .fetch_optional()
        .await
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

//! Identity service client.
//!
//! Password accounts live in the hosted backend's identity service under
//! `{base}/auth/v1`. Every request carries the anonymous key as `apikey`;
//! user-scoped requests also carry the session's bearer token.
//!
//! # Flow
//!
//! 1. `sign_up()` or `sign_in_with_password()` returns an [`AuthSession`]
//! 2. The session's access token is attached to row API requests
//! 3. `refresh()` exchanges the refresh token for a new session on expiry
//! 4. `sign_out()` revokes the refresh token server-side

mod types;

pub use types::{AuthSession, AuthUser, SignUp};

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::BackendConfig;
use types::{
    ErrorResponse, PasswordGrant, RefreshGrant, SignUpMetadata, SignUpRequest, SignUpResponse,
    TokenResponse, UserResponse,
};

/// Error codes the identity service uses for a bad email/password pair.
const INVALID_CREDENTIAL_CODES: &[&str] = &["invalid_grant", "invalid_credentials"];

/// Errors from the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Email/password pair was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The service rejected the request.
    #[error("Identity service error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The token lifetime does not fit in a timestamp.
    #[error("Token lifetime out of range: {0} seconds")]
    InvalidExpiry(i64),
}

/// Client for the identity service.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    auth_url: Url,
    anon_key: SecretString,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("auth_url", &self.inner.auth_url.as_str())
            .finish_non_exhaustive()
    }
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot be extended.
    pub fn new(config: &BackendConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let auth_url = config.url.join("auth/v1/")?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                auth_url,
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` if the pair is rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, IdentityError> {
        let url = self.token_url("password")?;
        let token: TokenResponse = self
            .post_json(url, &PasswordGrant { email, password })
            .await?;
        let session = token.into_session(Utc::now())?;
        debug!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    /// Register a new account, storing `full_name` as user metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the registration (e.g. the
    /// email is taken or the password is too weak).
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUp, IdentityError> {
        let url = self.inner.auth_url.join("signup")?;
        let request = SignUpRequest {
            email,
            password,
            data: SignUpMetadata { full_name },
        };
        let response: SignUpResponse = self.post_json(url, &request).await?;

        Ok(match response {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now())?;
                debug!(user_id = %session.user.id, "Registered and signed in");
                SignUp::Session(session)
            }
            SignUpResponse::User(user) => {
                debug!(user_id = %user.id, "Registered, confirmation required");
                SignUp::ConfirmationRequired(user.into())
            }
        })
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is no longer valid.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, IdentityError> {
        let url = self.token_url("refresh_token")?;
        let grant = RefreshGrant {
            refresh_token: refresh_token.expose_secret(),
        };
        let token: TokenResponse = self.post_json(url, &grant).await?;
        token.into_session(Utc::now())
    }

    /// Fetch the account behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, IdentityError> {
        let url = self.inner.auth_url.join("user")?;
        let request = self
            .inner
            .client
            .get(url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(access_token.expose_secret());
        let user: UserResponse = send(request).await?;
        Ok(user.into())
    }

    /// Revoke the session server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), IdentityError> {
        let url = self.inner.auth_url.join("logout")?;
        let request = self
            .inner
            .client
            .post(url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(access_token.expose_secret());
        send_raw(request).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────────

    fn token_url(&self, grant_type: &str) -> Result<Url, IdentityError> {
        let mut url = self.inner.auth_url.join("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, IdentityError> {
        let request = self
            .inner
            .client
            .post(url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .json(body);
        send(request).await
    }
}

async fn send<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, IdentityError> {
    let body = send_raw(request).await?;
    Ok(serde_json::from_str(&body)?)
}

async fn send_raw(request: reqwest::RequestBuilder) -> Result<String, IdentityError> {
    let response = request.send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(IdentityError::RateLimited(retry_after));
    }

    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    let parsed: ErrorResponse = serde_json::from_str(&body).unwrap_or_default();
    if parsed
        .code()
        .is_some_and(|code| INVALID_CREDENTIAL_CODES.contains(&code))
    {
        return Err(IdentityError::InvalidCredentials);
    }

    warn!(status = %status, code = ?parsed.code(), "Identity service returned non-success status");
    Err(IdentityError::Api {
        status: status.as_u16(),
        code: parsed.code().map(str::to_owned),
        message: parsed
            .message()
            .map_or_else(|| body.chars().take(200).collect(), str::to_owned),
    })
}

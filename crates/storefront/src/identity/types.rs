//! Identity service request and response types.

use chrono::{DateTime, Duration, Utc};
use indian_flavour_core::ProfileId;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::IdentityError;

/// Seconds before expiry at which a session is treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// A signed-in session issued by the identity service.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Bearer token for row API and identity requests.
    pub access_token: SecretString,
    /// Token used to obtain a new session when this one expires.
    pub refresh_token: SecretString,
    /// When the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The account the session belongs to.
    pub user: AuthUser,
}

impl AuthSession {
    /// Whether the access token is expired at `now` (with a 60s margin).
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(Duration::seconds(EXPIRY_MARGIN_SECS))
            .is_none_or(|deadline| now >= deadline)
    }
}

/// The account behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: ProfileId,
    #[serde(default)]
    pub email: Option<String>,
    /// Name given at registration, if any.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Outcome of a registration.
#[derive(Debug, Clone)]
pub enum SignUp {
    /// The account is active and signed in.
    Session(AuthSession),
    /// The account exists but the email address must be confirmed before
    /// signing in.
    ConfirmationRequired(AuthUser),
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(super) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpMetadata<'a> {
    pub full_name: &'a str,
}

/// Raw token response from `/token` and `/signup`.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserResponse,
}

impl TokenResponse {
    /// Build a session, preferring the absolute `expires_at` over
    /// `obtained_at + expires_in`.
    pub fn into_session(self, obtained_at: DateTime<Utc>) -> Result<AuthSession, IdentityError> {
        let expires_at = match self.expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
            Some(at) => at,
            None => Duration::try_seconds(self.expires_in)
                .and_then(|lifetime| obtained_at.checked_add_signed(lifetime))
                .ok_or(IdentityError::InvalidExpiry(self.expires_in))?,
        };
        Ok(AuthSession {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
            user: self.user.into(),
        })
    }
}

/// Raw user object.
#[derive(Debug, Deserialize)]
pub(super) struct UserResponse {
    pub id: ProfileId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.user_metadata.full_name,
        }
    }
}

/// `/signup` answers with a session when no confirmation is needed and with
/// the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

/// Error body. Older deployments send `error`/`error_description`, newer
/// ones `error_code`/`msg`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    pub fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> AuthSession {
        AuthSession {
            access_token: SecretString::from("a"),
            refresh_token: SecretString::from("r"),
            expires_at,
            user: AuthUser {
                id: ProfileId::random(),
                email: None,
                full_name: None,
            },
        }
    }

    #[test]
    fn test_is_expired_uses_margin() {
        let now = Utc::now();
        assert!(!session_expiring_at(now + Duration::minutes(10)).is_expired(now));
        assert!(session_expiring_at(now + Duration::seconds(30)).is_expired(now));
        assert!(session_expiring_at(now - Duration::minutes(1)).is_expired(now));
        assert!(session_expiring_at(DateTime::<Utc>::MIN_UTC).is_expired(now));
    }

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1700003600,
            "refresh_token": "rt",
            "user": {"id": "5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10", "email": "a@b.co",
                     "user_metadata": {"full_name": "Asha Rao"}}
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        let session = token.into_session(Utc::now()).unwrap();
        assert_eq!(session.expires_at.timestamp(), 1_700_003_600);
        assert_eq!(session.user.full_name.as_deref(), Some("Asha Rao"));
    }

    #[test]
    fn test_token_response_falls_back_to_expires_in() {
        let json = r#"{
            "access_token": "jwt", "expires_in": 60, "refresh_token": "rt",
            "user": {"id": "5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10"}
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        let obtained = Utc::now();
        let session = token.into_session(obtained).unwrap();
        assert_eq!(session.expires_at, obtained + Duration::seconds(60));
        assert_eq!(session.user.email, None);
    }

    #[test]
    fn test_token_response_rejects_out_of_range_lifetime() {
        for expires_in in [i64::MAX, i64::MIN] {
            let json = format!(
                r#"{{"access_token": "jwt", "expires_in": {expires_in}, "refresh_token": "rt",
                    "user": {{"id": "5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10"}}}}"#
            );
            let token: TokenResponse = serde_json::from_str(&json).unwrap();
            let err = token.into_session(Utc::now()).unwrap_err();
            assert!(matches!(err, IdentityError::InvalidExpiry(secs) if secs == expires_in));
        }

        // Fits in a duration but not in a timestamp
        let json = r#"{"access_token": "jwt", "expires_in": 9000000000000, "refresh_token": "rt",
                       "user": {"id": "5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10"}}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            token.into_session(Utc::now()),
            Err(IdentityError::InvalidExpiry(9_000_000_000_000))
        ));
    }

    #[test]
    fn test_sign_up_response_variants() {
        let pending = r#"{"id": "5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10", "email": "a@b.co",
                          "confirmation_sent_at": "2024-01-01T00:00:00Z"}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpResponse>(pending).unwrap(),
            SignUpResponse::User(_)
        ));
    }

    #[test]
    fn test_error_response_both_shapes() {
        let old: ErrorResponse = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(old.code(), Some("invalid_grant"));
        assert_eq!(old.message(), Some("Invalid login credentials"));

        let new: ErrorResponse = serde_json::from_str(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(new.code(), Some("invalid_credentials"));
        assert_eq!(new.message(), Some("Invalid login credentials"));
    }
}

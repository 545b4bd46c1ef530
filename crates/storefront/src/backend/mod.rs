//! Client for the hosted backend's row API.
//!
//! # Architecture
//!
//! - The backend is the source of truth: NO local copies beyond the cart
//! - Tables are addressed as `{base}/rest/v1/{table}`
//! - Reads, joins and filters are expressed in the query string
//!   (`select=*,order_items(*)`, `user_id=eq.<id>`, `order=created_at.desc`)
//! - Row-level security runs as whoever's bearer token is attached; without a
//!   session the anonymous key is used
//!
//! # Example
//!
//! ```rust,ignore
//! use indian_flavour_storefront::backend::{BackendClient, Direction};
//!
//! let client = BackendClient::new(&config.backend)?;
//! let products: Vec<Product> = client
//!     .from("products")
//!     .select("*")
//!     .order("created_at", Direction::Descending)
//!     .fetch()
//!     .await?;
//! ```

mod query;

pub use query::{Direction, TableQuery};

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

/// Postgres error code for an RLS or privilege violation.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Errors that can occur when talking to the row API.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Postgres or API error code (e.g., `23505`, `PGRST116`).
        code: Option<String>,
        /// Human-readable message.
        message: String,
        /// Additional detail from the database.
        details: Option<String>,
        /// Suggested fix from the database.
        hint: Option<String>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// No row matched.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// An update or delete was built without any filter.
    #[error("Refusing to {0} every row of {1}: add a filter")]
    UnfilteredMutation(&'static str, String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BackendError {
    /// Whether the backend refused the request for lack of privileges.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                *status == 401 || *status == 403 || code.as_deref() == Some(INSUFFICIENT_PRIVILEGE)
            }
            _ => false,
        }
    }
}

/// Error body returned by the row API.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// Client for the row API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
    access_token: Option<Arc<SecretString>>,
}

struct BackendClientInner {
    client: reqwest::Client,
    rest_url: Url,
    anon_key: SecretString,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("rest_url", &self.inner.rest_url.as_str())
            .field("authenticated", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new row API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot be extended.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let rest_url = config.url.join("rest/v1/")?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                rest_url,
                anon_key: config.anon_key.clone(),
            }),
            access_token: None,
        })
    }

    /// A client that acts as the signed-in user.
    #[must_use]
    pub fn with_access_token(&self, token: SecretString) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            access_token: Some(Arc::new(token)),
        }
    }

    /// Whether requests carry a user session.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Start a query against `table`.
    #[must_use]
    pub fn from<'a>(&'a self, table: &'a str) -> TableQuery<'a> {
        TableQuery::new(self, table)
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        Ok(self.inner.rest_url.join(table)?)
    }

    /// Attach the API key and bearer token to a request.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .access_token
            .as_deref()
            .unwrap_or(&self.inner.anon_key)
            .expose_secret();
        request
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            tracing::warn!(
                status = %status,
                code = ?parsed.code,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Api {
                status: status.as_u16(),
                code: parsed.code,
                message: parsed
                    .message
                    .unwrap_or_else(|| body.chars().take(200).collect()),
                details: parsed.details,
                hint: parsed.hint,
            });
        }

        Ok(body)
    }
}

/// Parse a JSON body, logging the raw text on failure.
fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        BackendError::Parse(e)
    })
}

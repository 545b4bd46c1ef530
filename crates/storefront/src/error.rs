//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for everything the storefront can fail
//! at. Callers show [`AppError::user_message`] and call [`AppError::report`],
//! which logs the full error and captures unexpected ones to Sentry.

use thiserror::Error;

use crate::auth::AuthError;
use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::identity::IdentityError;
use crate::services::{AdminError, CatalogError, CheckoutError, OrdersError, ProfileError};
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Row API call outside any service failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Identity service call failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Authentication or access check failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Orders error: {0}")]
    Orders(#[from] OrdersError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// The message to show the user.
    ///
    /// Validation and access errors explain themselves; backend failures are
    /// reduced to a generic message per operation.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.to_string(),
            Self::Storage(_) => "Could not read or write local data".to_string(),
            Self::Backend(_) | Self::Identity(_) => "Service unavailable, please try again".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Identity(IdentityError::Api { message, .. }) => message.clone(),
                AuthError::Identity(_) | AuthError::Backend(_) => {
                    "Authentication error".to_string()
                }
                AuthError::Storage(_) => "Could not save your session".to_string(),
                other => capitalize(&other.to_string()),
            },
            Self::Catalog(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Orders(err) => err.to_string(),
            Self::Profile(err) => err.to_string(),
            Self::Admin(err) => capitalize(&err.to_string()),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Whether the error is a fault (worth a Sentry event) rather than a
    /// user mistake or access rejection.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Config(_) | Self::BadRequest(_) => false,
            Self::Auth(err) => matches!(
                err,
                AuthError::Identity(_) | AuthError::Backend(_) | AuthError::Storage(_)
            ),
            Self::Catalog(err) => matches!(err, CatalogError::Backend(_)),
            Self::Checkout(err) => matches!(
                err,
                CheckoutError::CreateOrder(_) | CheckoutError::CreateItems { .. }
            ),
            Self::Admin(err) => matches!(err, AdminError::Backend { .. }),
            Self::Storage(_)
            | Self::Backend(_)
            | Self::Identity(_)
            | Self::Orders(_)
            | Self::Profile(_) => true,
        }
    }

    /// Log the error and capture it to Sentry if unexpected.
    pub fn report(&self) {
        if self.is_unexpected() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command failed"
            );
        } else {
            tracing::debug!(error = %self, "Command rejected");
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

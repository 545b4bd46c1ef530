//! Signed-in user.

use indian_flavour_core::{Profile, ProfileId, Role};
use serde::{Deserialize, Serialize};

use crate::identity::AuthUser;

/// The signed-in user: identity-service account joined with its profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: ProfileId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    /// Combine the account with its profile. A missing profile row means a
    /// customer with no name yet.
    #[must_use]
    pub fn from_parts(account: &AuthUser, profile: Option<&Profile>) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            full_name: profile.and_then(|p| p.full_name.clone()),
            role: profile.map(|p| p.role).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name for greetings, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("customer")
    }
}

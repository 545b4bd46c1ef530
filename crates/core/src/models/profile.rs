//! `profiles` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProfileId, Role};

/// A user's profile row. Shares its id with the identity-service user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patch body for the profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    /// `None` clears the stored name.
    pub full_name: Option<String>,
}

impl ProfileUpdate {
    /// Build a patch from free-form input; blank input clears the name.
    #[must_use]
    pub fn full_name(input: &str) -> Self {
        let trimmed = input.trim();
        Self {
            full_name: (!trimmed.is_empty()).then(|| trimmed.to_owned()),
        }
    }
}

//! Profile page operations.

use indian_flavour_core::{Profile, ProfileId, ProfileUpdate};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::backend::{BackendClient, BackendError};

/// Shown after a successful update.
pub const PROFILE_UPDATED_MESSAGE: &str = "Profile updated successfully!";

/// Errors from the profile page.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to load profile")]
    Load(#[source] BackendError),

    #[error("Error updating profile. Please try again.")]
    Update(#[source] BackendError),
}

/// Load a profile row.
///
/// # Errors
///
/// Returns `ProfileError::Load` if the row cannot be read or does not exist.
#[instrument(skip(client))]
pub async fn get_profile(client: &BackendClient, id: ProfileId) -> Result<Profile, ProfileError> {
    client
        .from("profiles")
        .select("*")
        .eq("id", id)
        .fetch_one()
        .await
        .map_err(|e| {
            error!(error = %e, "Error fetching profile");
            ProfileError::Load(e)
        })
}

/// Set the display name. Input is trimmed; blank input clears the name.
///
/// The auth store should refresh its user afterwards.
///
/// # Errors
///
/// Returns `ProfileError::Update` if the write fails.
#[instrument(skip(client, full_name))]
pub async fn update_full_name(
    client: &BackendClient,
    id: ProfileId,
    full_name: &str,
) -> Result<(), ProfileError> {
    let patch = ProfileUpdate::full_name(full_name);
    client
        .from("profiles")
        .eq("id", id)
        .update::<_, serde_json::Value>(&patch)
        .await
        .map_err(|e| {
            error!(error = %e, "Error updating profile");
            ProfileError::Update(e)
        })?;
    info!("Profile updated");
    Ok(())
}

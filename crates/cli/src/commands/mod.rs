//! Command implementations, grouped by area.

pub mod account;
pub mod admin;
pub mod shop;

use indian_flavour_storefront::AppState;
use indian_flavour_storefront::auth::{Area, AuthStore};
use indian_flavour_storefront::error::AppError;
use indian_flavour_storefront::state::SharedStorage;

/// Restore the saved session and check it may enter `area`.
async fn session(state: &AppState, area: Area) -> Result<AuthStore<SharedStorage>, AppError> {
    let mut auth = state.auth_store();
    auth.load_user().await?;
    auth.authorize(area)?;
    Ok(auth)
}

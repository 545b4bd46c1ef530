//! Sign-in, registration, orders and profile commands.

use chrono::Utc;
use indian_flavour_storefront::AppState;
use indian_flavour_storefront::auth::{Area, Registration};
use indian_flavour_storefront::error::{AppError, clear_sentry_user, set_sentry_user};
use indian_flavour_storefront::services::{PROFILE_UPDATED_MESSAGE, my_orders, profile as profiles};

use super::session;
use crate::output;

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    let mut auth = session(state, Area::GuestOnly).await?;
    let user = auth.sign_in(email, password).await?;
    set_sentry_user(&user.id, user.email.as_deref());
    output::print(&format!("Welcome back, {}!", user.display_name()));
    Ok(())
}

pub async fn register(
    state: &AppState,
    email: &str,
    password: &str,
    full_name: &str,
) -> Result<(), AppError> {
    let mut auth = session(state, Area::GuestOnly).await?;
    match auth.sign_up(email, password, full_name).await? {
        Registration::SignedIn(user) => {
            set_sentry_user(&user.id, user.email.as_deref());
            output::print(&format!("Account created. Welcome, {}!", user.display_name()));
        }
        Registration::ConfirmationRequired => {
            output::print("Account created. Check your email to confirm it, then sign in.");
        }
    }
    Ok(())
}

pub async fn logout(state: &AppState) -> Result<(), AppError> {
    let mut auth = session(state, Area::Public).await?;
    let was_signed_in = auth.user().is_some();
    auth.sign_out().await?;
    clear_sentry_user();
    output::print(if was_signed_in {
        "Signed out"
    } else {
        "Not signed in"
    });
    Ok(())
}

pub async fn whoami(state: &AppState) -> Result<(), AppError> {
    let auth = session(state, Area::Public).await?;
    match auth.user() {
        Some(user) => output::print(&output::user(user)),
        None => output::print("Not signed in"),
    }
    Ok(())
}

pub async fn orders(state: &AppState) -> Result<(), AppError> {
    let auth = session(state, Area::Customer).await?;
    let user = auth.require_user()?;
    let orders = my_orders(&auth.client(), user).await?;
    output::print(&output::orders(&orders, Utc::now(), state.config().currency));
    Ok(())
}

pub async fn profile(state: &AppState) -> Result<(), AppError> {
    let auth = session(state, Area::Customer).await?;
    let user = auth.require_user()?;
    let profile = profiles::get_profile(&auth.client(), user.id).await?;
    output::print(&output::profile(&profile, user.email.as_deref()));
    Ok(())
}

pub async fn set_name(state: &AppState, full_name: &str) -> Result<(), AppError> {
    let mut auth = session(state, Area::Customer).await?;
    let id = auth.require_user()?.id;
    profiles::update_full_name(&auth.client(), id, full_name).await?;
    auth.refresh_profile().await?;
    output::print(PROFILE_UPDATED_MESSAGE);
    Ok(())
}

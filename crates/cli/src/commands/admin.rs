//! Admin panel commands.
//!
//! # Usage
//!
//! ```bash
//! flavour admin products create --name "Paneer Tikka" --price 320 \
//!     --description "Tandoor-grilled cottage cheese"
//! flavour admin products update <product-id> --name "Paneer Tikka" --price 340
//! flavour admin orders status <order-id> confirmed
//! ```

use clap::Args;
use indian_flavour_core::{OrderId, OrderStatus, ProductId, ProductInput};
use indian_flavour_storefront::AppState;
use indian_flavour_storefront::auth::{Area, AuthStore};
use indian_flavour_storefront::error::AppError;
use indian_flavour_storefront::services::{AdminError, AdminService};
use indian_flavour_storefront::state::SharedStorage;

use super::session;
use crate::output;

/// Product form fields.
#[derive(Debug, Args)]
pub struct ProductFields {
    #[arg(long)]
    pub name: String,

    /// Price in the store currency, e.g. `249.50`
    #[arg(long)]
    pub price: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub image_url: Option<String>,
}

impl ProductFields {
    fn parse(&self) -> Result<ProductInput, AdminError> {
        ProductInput::parse(
            &self.name,
            self.description.as_deref(),
            &self.price,
            self.image_url.as_deref(),
        )
        .map_err(AdminError::from)
    }
}

async fn admin_session(state: &AppState) -> Result<AuthStore<SharedStorage>, AppError> {
    session(state, Area::Admin).await
}

pub async fn dashboard(state: &AppState) -> Result<(), AppError> {
    let auth = admin_session(state).await?;
    let client = auth.client();
    let admin = AdminService::new(auth.require_admin()?, &client, state.catalog())?;
    let stats = admin.dashboard().await?;
    output::print(&output::dashboard(&stats, state.config().currency));
    Ok(())
}

pub async fn list_products(state: &AppState) -> Result<(), AppError> {
    let auth = admin_session(state).await?;
    let client = auth.client();
    let admin = AdminService::new(auth.require_admin()?, &client, state.catalog())?;
    let products = admin.list_products().await?;
    output::print(&output::products(&products, state.config().currency));
    Ok(())
}

pub async fn create_product(state: &AppState, fields: &ProductFields) -> Result<(), AppError> {
    let input = fields.parse()?;
    let auth = admin_session(state).await?;
    let client = auth.client();
    let admin = AdminService::new(auth.require_admin()?, &client, state.catalog())?;
    let product = admin.create_product(&input).await?;
    output::print(&format!("Created {} ({})", product.name, product.id));
    Ok(())
}

pub async fn update_product(
    state: &AppState,
    id: ProductId,
    fields: &ProductFields,
) -> Result<(), AppError> {
    let input = fields.parse()?;
    let auth = admin_session(state).await?;
    let client = auth.client();
    let admin = AdminService::new(auth.require_admin()?, &client, state.catalog())?;
    let product = admin.update_product(id, &input).await?;
    output::print(&format!("Updated {} ({})", product.name, product.id));
    Ok(())
}

pub async fn delete_product(state: &AppState, id: ProductId) -> Result<(), AppError> {
    let auth = admin_session(state).await?;
    let client = auth.client();
    let admin = AdminService::new(auth.require_admin()?, &client, state.catalog())?;
    admin.delete_product(id).await?;
    output::print(&format!("Deleted product {}", id.short()));
    Ok(())
}

pub async fn list_orders(state: &AppState) -> Result<(), AppError> {
    let auth = admin_session(state).await?;
    let client = auth.client();
    let admin = AdminService::new(auth.require_admin()?, &client, state.catalog())?;
    let orders = admin.list_orders().await?;
    output::print(&output::admin_orders(&orders, state.config().currency));
    Ok(())
}

pub async fn update_order_status(
    state: &AppState,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), AppError> {
    let auth = admin_session(state).await?;
    let client = auth.client();
    let admin = AdminService::new(auth.require_admin()?, &client, state.catalog())?;
    admin.update_order_status(id, status).await?;
    output::print(&format!("Order #{} is now {}", id.short(), status.label()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use indian_flavour_core::ProductInputError;

    use super::*;

    fn fields(name: &str, price: &str) -> ProductFields {
        ProductFields {
            name: name.to_owned(),
            price: price.to_owned(),
            description: Some("  ".to_owned()),
            image_url: None,
        }
    }

    #[test]
    fn test_fields_are_validated_before_any_request() {
        assert!(matches!(
            fields(" ", "100").parse(),
            Err(AdminError::InvalidProduct(ProductInputError::MissingName))
        ));
        assert!(matches!(
            fields("Thali", "cheap").parse(),
            Err(AdminError::InvalidProduct(ProductInputError::InvalidPrice(_)))
        ));
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let input = fields("Veg Thali", "180").parse();
        assert!(matches!(input, Ok(ProductInput { description: None, .. })));
    }
}

//! Menu, cart and checkout commands.

use chrono::Utc;
use indian_flavour_core::{DeliveryDetails, ProductId};
use indian_flavour_storefront::AppState;
use indian_flavour_storefront::auth::Area;
use indian_flavour_storefront::cart::CartStore;
use indian_flavour_storefront::error::{AppError, add_breadcrumb};
use indian_flavour_storefront::services::{CheckoutError, place_order};
use indian_flavour_storefront::state::SharedStorage;
use indian_flavour_storefront::storage::{LocalStorage, StorageError};

use super::session;
use crate::output;

pub async fn products(state: &AppState) -> Result<(), AppError> {
    let products = state.catalog().list_products().await?;
    output::print(&output::products(&products, state.config().currency));
    Ok(())
}

/// The saved cart, for a signed-in customer.
async fn open_cart(state: &AppState) -> Result<CartStore<SharedStorage>, AppError> {
    session(state, Area::Customer).await?;
    Ok(state.cart_store()?)
}

fn show(state: &AppState, cart: &CartStore<SharedStorage>) {
    output::print(&output::cart(cart.cart(), state.config().currency));
}

/// A change to one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEdit {
    Remove,
    Set(u32),
    Increment,
    Decrement,
}

/// Apply `edit` to the product's line. A product that is not in the cart
/// leaves it untouched and yields a notice instead.
fn edit_line<S: LocalStorage>(
    cart: &mut CartStore<S>,
    product_id: ProductId,
    edit: LineEdit,
) -> Result<Option<String>, StorageError> {
    if cart.cart().line(product_id).is_none() {
        return Ok(Some(format!(
            "Product {} is not in your cart",
            product_id.short()
        )));
    }
    match edit {
        LineEdit::Remove => cart.remove_item(product_id)?,
        LineEdit::Set(quantity) => cart.update_quantity(product_id, quantity)?,
        LineEdit::Increment => cart.increment(product_id)?,
        LineEdit::Decrement => cart.decrement(product_id)?,
    }
    Ok(None)
}

async fn edit(state: &AppState, product_id: ProductId, change: LineEdit) -> Result<(), AppError> {
    let mut cart = open_cart(state).await?;
    if let Some(notice) = edit_line(&mut cart, product_id, change)? {
        output::print(&notice);
    }
    show(state, &cart);
    Ok(())
}

pub async fn show_cart(state: &AppState) -> Result<(), AppError> {
    let cart = open_cart(state).await?;
    show(state, &cart);
    Ok(())
}

/// Add one of a product. Guests may fill a cart before signing in.
pub async fn add(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    let product = state.catalog().get_product(product_id).await?;
    let mut cart = state.cart_store()?;
    cart.add_item(&product)?;
    let id = product_id.to_string();
    add_breadcrumb("cart", "Added product", Some(&[("product_id", id.as_str())]));
    output::print(&format!("Added {} to your cart", product.name));
    show(state, &cart);
    Ok(())
}

pub async fn remove(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    edit(state, product_id, LineEdit::Remove).await
}

pub async fn set_quantity(
    state: &AppState,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), AppError> {
    edit(state, product_id, LineEdit::Set(quantity)).await
}

pub async fn increment(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    edit(state, product_id, LineEdit::Increment).await
}

pub async fn decrement(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    edit(state, product_id, LineEdit::Decrement).await
}

pub async fn clear(state: &AppState) -> Result<(), AppError> {
    let mut cart = open_cart(state).await?;
    cart.clear()?;
    show(state, &cart);
    Ok(())
}

pub async fn checkout(
    state: &AppState,
    address: &str,
    contact: &str,
    instructions: Option<&str>,
) -> Result<(), AppError> {
    let auth = session(state, Area::Customer).await?;
    let user = auth.require_user()?;
    let mut cart = state.cart_store()?;

    let delivery =
        DeliveryDetails::parse(address, contact, instructions).map_err(CheckoutError::from)?;
    let placed = place_order(&auth.client(), user, cart.cart(), delivery, Utc::now()).await?;

    // The order exists now; a failure to clear the local cart is only logged
    if let Err(e) = cart.clear() {
        tracing::warn!(
            error = %e,
            order_id = %placed.order.id,
            "Failed to clear cart after checkout"
        );
    }
    add_breadcrumb("checkout", "Order placed", None);
    output::print(&placed.invoice(state.config().currency).to_string());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use chrono::Utc;
    use indian_flavour_core::Product;
    use indian_flavour_storefront::config::{BackendConfig, StorefrontConfig};
    use indian_flavour_storefront::storage::MemoryStorage;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn jalebi() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::random(),
            name: "Jalebi".to_owned(),
            description: None,
            price: Decimal::from(60),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn cart_with(product: &Product) -> CartStore<Arc<MemoryStorage>> {
        let mut cart = CartStore::load(Arc::new(MemoryStorage::new())).unwrap();
        cart.add_item(product).unwrap();
        cart.add_item(product).unwrap();
        cart
    }

    #[test]
    fn test_edits_to_absent_products_leave_cart_alone() {
        let product = jalebi();
        let mut cart = cart_with(&product);
        let stranger = ProductId::random();

        for change in [
            LineEdit::Remove,
            LineEdit::Set(5),
            LineEdit::Increment,
            LineEdit::Decrement,
        ] {
            let notice = edit_line(&mut cart, stranger, change).unwrap();
            assert_eq!(
                notice,
                Some(format!("Product {} is not in your cart", stranger.short()))
            );
        }
        assert_eq!(cart.cart().item_count(), 2);
        assert_eq!(cart.cart().line(product.id).map(|l| l.quantity), Some(2));
    }

    #[test]
    fn test_edits_apply_to_present_lines() {
        let product = jalebi();
        let mut cart = cart_with(&product);
        let quantity = |cart: &CartStore<Arc<MemoryStorage>>| {
            cart.cart().line(product.id).map(|l| l.quantity)
        };

        assert_eq!(edit_line(&mut cart, product.id, LineEdit::Set(4)).unwrap(), None);
        assert_eq!(quantity(&cart), Some(4));
        edit_line(&mut cart, product.id, LineEdit::Decrement).unwrap();
        assert_eq!(quantity(&cart), Some(3));
        edit_line(&mut cart, product.id, LineEdit::Remove).unwrap();
        assert!(cart.cart().is_empty());
    }

    #[tokio::test]
    async fn test_guests_can_add_to_cart() {
        let server = MockServer::start().await;
        let product = jalebi();
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("id", format!("eq.{}", product.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([product])))
            .expect(1)
            .mount(&server)
            .await;

        let backend = BackendConfig::new(&server.uri(), SecretString::from("anon-test-key")).unwrap();
        let config = StorefrontConfig::new(backend, Path::new(".flavour").to_path_buf());
        let state = AppState::with_storage(config, Arc::new(MemoryStorage::new())).unwrap();

        add(&state, product.id).await.unwrap();

        let cart = state.cart_store().unwrap();
        assert_eq!(cart.cart().line(product.id).map(|l| l.quantity), Some(1));
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.url.path().starts_with("/auth/")));
    }
}

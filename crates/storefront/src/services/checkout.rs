//! Placing orders.
//!
//! An order is two writes: the `orders` row, then one `order_items` row per
//! cart line. There is no transaction across them; if the second write fails
//! the order row stays behind and is logged with its id.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use indian_flavour_core::{
    Cart, CartLine, CurrencyCode, DeliveryDetails, DeliveryDetailsError, NewOrder, NewOrderItem,
    Order, OrderId, Price,
};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::backend::{BackendClient, BackendError};
use crate::models::CurrentUser;

/// How long after ordering the food is expected to arrive.
pub const DELIVERY_LEAD_TIME_HOURS: i64 = 2;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Delivery(#[from] DeliveryDetailsError),

    #[error("Failed to place order")]
    CreateOrder(#[source] BackendError),

    #[error("Failed to place order")]
    CreateItems {
        order_id: OrderId,
        #[source]
        source: BackendError,
    },
}

/// A successfully placed order, ready to render as an invoice.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<CartLine>,
    pub delivery: DeliveryDetails,
}

impl PlacedOrder {
    /// Plain-text invoice in `currency`.
    #[must_use]
    pub const fn invoice(&self, currency: CurrencyCode) -> Invoice<'_> {
        Invoice {
            placed: self,
            currency,
        }
    }
}

/// Printable order confirmation.
#[derive(Debug)]
pub struct Invoice<'a> {
    placed: &'a PlacedOrder,
    currency: CurrencyCode,
}

impl fmt::Display for Invoice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let PlacedOrder {
            order,
            lines,
            delivery,
        } = self.placed;

        writeln!(f, "Order Confirmation")?;
        writeln!(f, "Thank you for your order!")?;
        writeln!(f, "Order #{}", order.id.short())?;
        writeln!(f)?;
        writeln!(f, "Delivery Information")?;
        writeln!(f, "  {}", delivery.address)?;
        writeln!(f, "  {}", delivery.contact)?;
        if let Some(instructions) = &delivery.instructions {
            writeln!(f, "  Note: {instructions}")?;
        }
        writeln!(f)?;
        writeln!(f, "Order Items")?;
        for line in lines {
            writeln!(
                f,
                "  {} x{}  {}",
                line.name,
                line.quantity,
                Price::new(line.line_total(), self.currency)
            )?;
        }
        writeln!(f)?;
        write!(f, "Total  {}", Price::new(order.total_amount, self.currency))
    }
}

/// Estimated delivery time for an order placed at `now`.
#[must_use]
pub fn estimated_delivery(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(DELIVERY_LEAD_TIME_HOURS)
}

/// Place an order for `cart`.
///
/// The caller clears the persisted cart only after this succeeds.
///
/// # Errors
///
/// Returns `EmptyCart` or a delivery validation error before any request is
/// made, and `CreateOrder`/`CreateItems` if a write fails.
#[instrument(skip(client, user, cart, delivery), fields(user_id = %user.id, lines = cart.lines().len()))]
pub async fn place_order(
    client: &BackendClient,
    user: &CurrentUser,
    cart: &Cart,
    delivery: DeliveryDetails,
    now: DateTime<Utc>,
) -> Result<PlacedOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let new_order = NewOrder::pending(user.id, cart.total(), &delivery, estimated_delivery(now));
    let order: Order = client
        .from("orders")
        .insert_one(&new_order)
        .await
        .map_err(|e| {
            error!(error = %e, "Error creating order");
            CheckoutError::CreateOrder(e)
        })?;

    let items: Vec<NewOrderItem> = cart
        .lines()
        .iter()
        .map(|line| NewOrderItem {
            order_id: order.id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.price,
        })
        .collect();

    if let Err(source) = client.from("order_items").insert_only(&items).await {
        error!(order_id = %order.id, error = %source, "Order created but its items were not saved");
        return Err(CheckoutError::CreateItems {
            order_id: order.id,
            source,
        });
    }

    info!(order_id = %order.id, total = %order.total_amount, "Order placed");
    Ok(PlacedOrder {
        order,
        lines: cart.lines().to_vec(),
        delivery,
    })
}

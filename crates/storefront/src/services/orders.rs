//! Customer order tracking.

use chrono::{DateTime, Utc};
use indian_flavour_core::Order;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::backend::{BackendClient, BackendError, Direction};
use crate::models::{CurrentUser, ORDER_WITH_ITEMS_SELECT, OrderWithItems};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Errors from loading orders.
#[derive(Debug, Error)]
#[error("Failed to load orders")]
pub struct OrdersError(#[from] pub BackendError);

/// The user's orders, newest first, with their items and products.
///
/// Row-level security already limits customers to their own orders; the
/// explicit `user_id` filter keeps admins' own listings to their orders too.
///
/// # Errors
///
/// Returns `OrdersError` if the orders cannot be loaded.
#[instrument(skip(client, user), fields(user_id = %user.id))]
pub async fn my_orders(
    client: &BackendClient,
    user: &CurrentUser,
) -> Result<Vec<OrderWithItems>, OrdersError> {
    let orders: Vec<OrderWithItems> = client
        .from("orders")
        .select(ORDER_WITH_ITEMS_SELECT)
        .eq("user_id", user.id)
        .order("created_at", Direction::Descending)
        .fetch()
        .await
        .inspect_err(|e| error!(error = %e, "Error fetching orders"))?;
    debug!(count = orders.len(), "Loaded orders");
    Ok(orders)
}

/// Time until delivery, e.g. `"45 minutes"`, `"2 hours"` or `"Arriving soon"`.
///
/// Minutes are rounded half up; past-due and imminent deliveries read as
/// arriving soon.
#[must_use]
pub fn delivery_eta(estimated: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let millis = (estimated - now).num_milliseconds();
    let minutes = (millis + MILLIS_PER_MINUTE / 2).div_euclid(MILLIS_PER_MINUTE);

    if minutes <= 0 {
        "Arriving soon".to_owned()
    } else if minutes < 60 {
        format!("{minutes} minutes")
    } else {
        format!("{} hours", (minutes + 30).div_euclid(60))
    }
}

/// ETA for an order, or `None` once delivered or when no estimate exists.
#[must_use]
pub fn order_eta(order: &Order, now: DateTime<Utc>) -> Option<String> {
    if order.is_delivered() {
        return None;
    }
    order
        .estimated_delivery_time
        .map(|estimated| delivery_eta(estimated, now))
}

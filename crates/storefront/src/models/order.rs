//! Joined order shapes returned by embedded selects.

use chrono::{DateTime, Utc};
use indian_flavour_core::{
    DeliveryStatus, Order, OrderId, OrderItem, OrderItemId, OrderStatus, Product, ProfileId,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Select clause for [`OrderWithItems`].
pub const ORDER_WITH_ITEMS_SELECT: &str = "*,items:order_items(*,product:products(*))";

/// Select clause for [`AdminOrder`].
pub const ADMIN_ORDER_SELECT: &str = "*,profiles:user_id(full_name,email),\
                                      order_items(id,quantity,unit_price,products(name))";

/// A customer's order with its lines and their products.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub items: Vec<OrderItemWithProduct>,
}

/// An order line with the product it refers to. The product is absent when
/// it has since been deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemWithProduct {
    #[serde(flatten)]
    pub item: OrderItem,
    #[serde(default)]
    pub product: Option<Product>,
}

impl OrderItemWithProduct {
    #[must_use]
    pub fn product_name(&self) -> &str {
        self.product.as_ref().map_or("Removed product", |p| p.name.as_str())
    }
}

/// An order as listed in the admin panel.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminOrder {
    pub id: OrderId,
    pub user_id: ProfileId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_contact: Option<String>,
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    pub created_at: DateTime<Utc>,
    /// The customer; `None` when row-level security hides the profile.
    #[serde(default)]
    pub profiles: Option<ProfileSummary>,
    #[serde(default)]
    pub order_items: Vec<AdminOrderItem>,
}

impl AdminOrder {
    /// Customer name for listings.
    #[must_use]
    pub fn customer_name(&self) -> &str {
        self.profiles
            .as_ref()
            .and_then(|p| p.full_name.as_deref().or(p.email.as_deref()))
            .unwrap_or("Unknown customer")
    }
}

/// The customer columns embedded in an [`AdminOrder`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSummary {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An order line as listed in the admin panel.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminOrderItem {
    pub id: OrderItemId,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub products: Option<ProductName>,
}

impl AdminOrderItem {
    #[must_use]
    pub fn product_name(&self) -> &str {
        self.products
            .as_ref()
            .map_or("Removed product", |p| p.name.as_str())
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductName {
    pub name: String,
}
